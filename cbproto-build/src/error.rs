use std::fmt;

/// Failures that can occur while turning a `CodeGeneratorRequest` into a
/// `CodeGeneratorResponse`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The stdin bytes did not decode as a `CodeGeneratorRequest`, or the
    /// response could not be written back out.
    MalformedRequest(String),
    /// A message or enum descriptor is missing data the builder requires
    /// (e.g. an unnamed message).
    MalformedDescriptor { file: String, detail: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedRequest(detail) => {
                write!(f, "failed to decode CodeGeneratorRequest: {detail}")
            }
            Error::MalformedDescriptor { file, detail } => {
                write!(f, "{file}: {detail}")
            }
        }
    }
}

impl std::error::Error for Error {}
