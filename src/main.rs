use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    melopref_lib::init_logging();

    let cli = melopref_lib::cli::Cli::parse();
    match melopref_lib::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e.message());
            ExitCode::FAILURE
        }
    }
}
