use std::process;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kafka_demo::{connect_broker, Config, DemoRunner};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::load() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    };
    info!("Loaded configuration: {:?}", config);

    let broker = match connect_broker(config.clone()) {
        Ok(broker) => broker,
        Err(e) => {
            error!("Failed to create {} broker: {}", config.broker_mode.as_str(), e);
            process::exit(1);
        }
    };

    if let Err(e) = broker.health_check().await {
        error!("{} broker not reachable: {}", broker.name(), e);
        process::exit(1);
    }

    match DemoRunner::new(config, broker).run().await {
        Ok(report) if report.all_completed() => info!("Demo finished"),
        Ok(_) => {
            warn!("Demo finished with timed out stages");
            process::exit(1);
        }
        Err(e) => {
            error!("Demo aborted: {}", e);
            process::exit(1);
        }
    }
}
