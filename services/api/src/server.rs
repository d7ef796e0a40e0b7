use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use whitelist_relay::config::{AppConfig, AppEnvironment, ConfigError};
use whitelist_relay::error::AppError;
use whitelist_relay::relay::{
    outbound_client, DiscordNotifier, RelayService, RelaySettings, TurnstileVerifier,
};
use whitelist_relay::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let settings = RelaySettings::from_config(&config.relay);
    if let Err(missing) = &settings.credentials {
        if config.environment == AppEnvironment::Production {
            return Err(ConfigError::MissingCredentials(missing.clone()).into());
        }
        warn!(%missing, "relay credentials incomplete; applications will be answered with 500");
    }

    let client = outbound_client(config.relay.outbound_timeout)?;
    let verifier = Arc::new(TurnstileVerifier::new(
        client.clone(),
        config.relay.verify_url.clone(),
    ));
    let notifier = Arc::new(DiscordNotifier::new(client));
    let relay_service = Arc::new(RelayService::new(settings, verifier, notifier));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Some(Arc::new(prometheus_handle)),
    };

    let app = with_operational_routes(relay_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        field_policy = ?config.relay.field_policy,
        "whitelist relay ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
