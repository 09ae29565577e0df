use std::process::ExitCode;

use tracing::{error, info};

use feed_indexer::{Dependencies, IndexerSettings, IndexingError};
use feed_indexer_shared::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let settings = match IndexerSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    telemetry::init_tracing(settings.log_format);

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Feed indexer stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: IndexerSettings) -> Result<(), IndexingError> {
    let Dependencies { mut orchestrator } = Dependencies::new(&settings).await?;

    let shutdown = orchestrator.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, finishing current cycle");
            let _ = shutdown.send(());
        }
    });

    orchestrator.run().await?;
    Ok(())
}
