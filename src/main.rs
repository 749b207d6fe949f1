// src/main.rs

use std::process::ExitCode;

use sitepipe::{CommandStatus, cli, logging, run};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run_main().await {
        Ok(status) => status.into(),
        Err(err) => {
            eprintln!("sitepipe error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run_main() -> anyhow::Result<CommandStatus> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
