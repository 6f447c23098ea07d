#![forbid(unsafe_code)]

use std::process::ExitCode;

fn main() -> ExitCode {
    regent::runtime::logging::init("warn");
    match regent_cli::run_from_env() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("regentctl: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}
