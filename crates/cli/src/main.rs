use std::process::ExitCode;

fn main() -> ExitCode {
    orderlens_cli::run()
}
