use std::collections::HashMap;

/// Client/server emission style selected by the `mode` plugin option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Sync,
    Async,
}

/// Parsed form of `CodeGeneratorRequest.parameter`: a single comma-separated
/// string of `key` or `key=value` tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub mode: Mode,
    pub include_google: bool,
    /// Unrecognized keys, preserved as `true`-valued flags for forward
    /// compatibility with features this generator doesn't implement yet.
    pub extra: HashMap<String, bool>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            mode: Mode::Sync,
            include_google: false,
            extra: HashMap::new(),
        }
    }
}

impl Options {
    pub fn parse(parameter: &str) -> Options {
        let mut options = Options::default();
        if parameter.trim().is_empty() {
            return options;
        }
        for token in parameter.split(',') {
            let token = token.trim().to_ascii_lowercase();
            if token.is_empty() {
                continue;
            }
            match token.split_once('=') {
                Some(("mode", "async")) => options.mode = Mode::Async,
                Some(("mode", "sync")) => options.mode = Mode::Sync,
                Some((key, _)) => {
                    options.extra.insert(key.to_string(), true);
                }
                None if token == "include_google" => options.include_google = true,
                None => {
                    options.extra.insert(token, true);
                }
            }
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_sync_mode() {
        let opts = Options::parse("");
        assert_eq!(opts.mode, Mode::Sync);
        assert!(!opts.include_google);
    }

    #[test]
    fn parses_mode_and_flags() {
        let opts = Options::parse("mode=async,include_google,future_flag");
        assert_eq!(opts.mode, Mode::Async);
        assert!(opts.include_google);
        assert_eq!(opts.extra.get("future_flag"), Some(&true));
    }

    #[test]
    fn is_case_insensitive() {
        let opts = Options::parse("MODE=ASYNC");
        assert_eq!(opts.mode, Mode::Async);
    }
}
