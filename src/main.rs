use std::process::ExitCode;

fn main() -> ExitCode {
    loopbus::app::startup::startup()
}
