use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use feed_relay::feed::ReconnectPolicy;
use feed_relay::producer::KafkaPublisher;
use feed_relay::{Relay, RelayError, RelaySettings};
use feed_indexer_shared::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let settings = match RelaySettings::from_env() {
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
            error!(error = %e, "Feed relay stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: RelaySettings) -> Result<(), RelayError> {
    let publisher = KafkaPublisher::new(&settings.kafka_broker, &settings.producer)?;
    let defaults = ReconnectPolicy::default();
    let relay = Relay::new(
        Arc::new(publisher),
        ReconnectPolicy {
            initial_delay: defaults.initial_delay.min(settings.max_reconnect_delay),
            max_delay: settings.max_reconnect_delay,
        },
    );

    let handle = relay.start(&settings.feed_url, &settings.kafka_topic)?;

    let run_limit = async {
        match settings.run_for {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, stopping relay"),
        _ = run_limit => info!("Run duration elapsed, stopping relay"),
    }

    handle.shutdown().await
}
