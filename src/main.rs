use alerter::configuration::get_configuration;
use alerter::startup::build;
use alerter::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("alerter".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let config = get_configuration()?;
    let app = build(config).await?;
    app.run().await?;

    Ok(())
}
