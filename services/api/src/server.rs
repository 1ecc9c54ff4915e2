use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemorySubmissionHandlers};
use crate::routes::with_form_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use workorder_forms::config::AppConfig;
use workorder_forms::error::AppError;
use workorder_forms::telemetry;
use workorder_forms::workflows::forms::FormService;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let matrix = config.forms.requirement_matrix()?;
    info!(
        scopes = matrix.entries().len(),
        source = ?config.forms.requirements_path,
        "requirement table loaded"
    );
    let handlers = Arc::new(InMemorySubmissionHandlers::new(Arc::new(matrix.clone())));
    let form_service = Arc::new(FormService::new(
        matrix,
        config.forms.upload_policy(),
        handlers,
    ));

    let app = with_form_routes(form_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "work order forms service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
