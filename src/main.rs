use std::process::ExitCode;

use clap::Parser;

use dhalo::HaloError;
use dhalo::cli::{Cli, execute};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let ctx = cli.context();
    ctx.init_logging();

    let stdout = std::io::stdout().lock();
    match execute(cli, &ctx, stdout) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("[dhalo] some haloes failed; see log above");
            ExitCode::FAILURE
        }
        Err(err) => {
            match err.downcast_ref::<HaloError>() {
                Some(halo) => eprintln!("[dhalo] {}: {:#}", halo.root_cause().kind(), err),
                None => eprintln!("[dhalo] error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}
