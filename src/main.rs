use std::process::ExitCode;

fn main() -> ExitCode {
    focusflow::run()
}
