use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use titanic::api::{self, Cli};
use titanic::common::config::AppCfg;
use titanic::common::log;
use titanic::{TitanicCode, TitanicError};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut cfg = AppCfg::load();
    cli.apply(&mut cfg);
    log::init(&cfg);

    match api::run(cli, &cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err
                .downcast_ref::<TitanicError>()
                .map_or(TitanicCode::Internal, TitanicError::code);
            error!(code = code as u32, "{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(code as u8)
        }
    }
}
