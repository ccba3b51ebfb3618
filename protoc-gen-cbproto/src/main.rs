//! Thin stdin/stdout wrapper around `cbproto_build::compile_request`. All of
//! the actual work -- descriptor building, type resolution and source
//! emission -- lives in the `cbproto-build` library crate; this binary only
//! speaks the `protoc` plugin protocol.

use std::io::{self, Read, Write};
use std::process::ExitCode;

use prost::Message;
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("protoc-gen-cbproto: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), cbproto_build::Error> {
    let mut buf = Vec::new();
    io::stdin()
        .read_to_end(&mut buf)
        .map_err(|e| cbproto_build::Error::MalformedRequest(format!("failed to read stdin: {e}")))?;

    if let Ok(dump_path) = std::env::var("CBIPROTO_DUMP") {
        if let Err(e) = std::fs::write(&dump_path, &buf) {
            log::warn!("could not write CBIPROTO_DUMP file {dump_path}: {e}");
        }
    }

    let request = CodeGeneratorRequest::decode(buf.as_slice())
        .map_err(|e| cbproto_build::Error::MalformedRequest(e.to_string()))?;

    let response = cbproto_build::compile_request(request)?;
    write_response(&response).map_err(|e| cbproto_build::Error::MalformedRequest(format!("failed to write response: {e}")))
}

fn write_response(response: &CodeGeneratorResponse) -> io::Result<()> {
    let mut buf = Vec::with_capacity(response.encoded_len());
    response.encode(&mut buf).expect("CodeGeneratorResponse encoding is infallible for a valid buffer");
    io::stdout().write_all(&buf)
}
