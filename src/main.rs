use scc_preflight::Outcome;
use std::process::ExitCode;

fn main() -> ExitCode {
    match scc_preflight::run() {
        Ok(Outcome::Pass) => ExitCode::SUCCESS,
        Ok(Outcome::Fail) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error[{}]: {}", e.code(), e);
            ExitCode::from(2)
        }
    }
}
