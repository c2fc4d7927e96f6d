use marketplace_messaging::api;
use marketplace_messaging::common::init;
use marketplace_messaging::settings::AppSettings;
use marketplace_messaging::workers::daemons::pubsub_consumer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = AppSettings::get();
    init::initialize_logging(&settings);
    match settings.app_component.as_str() {
        "api" => api::serve(settings).await,
        "pubsub-consumer" => pubsub_consumer::serve(settings).await,
        component => anyhow::bail!("Unknown app component: {component}"),
    }
}
