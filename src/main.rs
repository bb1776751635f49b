use std::process::ExitCode;

fn main() -> ExitCode {
    match lnsync::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            lnsync::ui::output::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
