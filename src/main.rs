use std::process::ExitCode;

fn main() -> ExitCode {
    declgraph::cli::run()
}
