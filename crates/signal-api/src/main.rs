//! 퍼프 시그널 API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다.
//! 헬스 체크와 심볼/타임프레임별 시그널 조회 엔드포인트를 제공합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use signal_api::metrics::setup_metrics_recorder;
use signal_api::middleware::metrics_layer;
use signal_api::openapi::swagger_ui_router;
use signal_api::routes::create_api_router;
use signal_api::state::AppState;
use signal_core::{init_logging, AppConfig, LogConfig, LogFormat};
use signal_engine::{GeneratorConfig, SignalGenerator};
use signal_exchange::{HyperliquidClient, HyperliquidConfig};

/// 서버 바인딩 설정.
struct ServerConfig {
    /// 바인딩할 호스트 주소
    host: String,
    /// 바인딩할 포트
    port: u16,
}

impl ServerConfig {
    /// 설정 파일 값에 환경 변수 오버라이드를 적용해 로드합니다.
    ///
    /// `API_HOST` / `API_PORT`가 설정되어 있으면 우선합니다.
    fn from_config(config: &AppConfig) -> Self {
        let host = std::env::var("API_HOST").unwrap_or_else(|_| config.server.host.clone());
        let port = std::env::var("API_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(config.server.port);

        Self { host, port }
    }

    /// 소켓 주소 반환.
    ///
    /// # Errors
    /// `host:port` 형식이 유효하지 않으면 `AddrParseError`를 반환합니다.
    fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// CORS 미들웨어 구성.
///
/// `CORS_ORIGINS` 환경변수가 설정되어 있으면 해당 origin만 허용합니다.
/// 설정되지 않으면 개발 모드로 간주하여 모든 origin을 허용합니다.
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => {
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    // 메트릭 라우터 (별도 상태)
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    Router::new()
        .merge(metrics_router)
        .merge(create_api_router().with_state(state))
        // OpenAPI 문서 및 Swagger UI
        .merge(swagger_ui_router())
        // 메트릭 미들웨어 (모든 요청에 적용)
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        // 전역 타임아웃 (30초) - 408 상태 코드 반환
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(cors_layer())
}

/// OpenAPI 스펙 내보내기 처리.
///
/// `--export-openapi` 플래그 또는 `EXPORT_OPENAPI` 환경변수가 설정된 경우
/// OpenAPI JSON 스펙을 stdout으로 출력하고 종료합니다.
fn handle_export_openapi() -> Result<(), Box<dyn std::error::Error>> {
    use signal_api::openapi::ApiDoc;
    use utoipa::OpenApi as _;

    let export_flag = std::env::args().any(|arg| arg == "--export-openapi");
    let export_env = std::env::var("EXPORT_OPENAPI")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    if export_flag || export_env {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&spec)?;
        println!("{}", json);
        std::process::exit(0);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    // OpenAPI 내보내기 처리 (서버 시작 전)
    handle_export_openapi()?;

    // 설정 로드 (config/default.toml + SIGNAL__* 환경변수)
    let config = AppConfig::load_default()?;

    // tracing 초기화
    let log_format = config
        .logging
        .format
        .parse::<LogFormat>()
        .unwrap_or_default();
    init_logging(LogConfig::new(config.logging.level.clone()).with_format(log_format))?;

    info!("Starting Signal API server...");

    // Prometheus 메트릭 레코더 설정
    let metrics_handle = setup_metrics_recorder();
    info!("Prometheus metrics recorder initialized");

    // 서버 주소 해석
    let server = ServerConfig::from_config(&config);
    let addr = server.socket_addr().map_err(|e| {
        error!(
            host = %server.host,
            port = server.port,
            error = %e,
            "소켓 주소 설정이 유효하지 않습니다. API_HOST, API_PORT 환경변수를 확인하세요."
        );
        e
    })?;

    // Hyperliquid 클라이언트 생성 (HYPERLIQUID_API_URL 환경변수 우선)
    let mut hl_config = HyperliquidConfig::from(config.hyperliquid.clone());
    if let Ok(url) = std::env::var("HYPERLIQUID_API_URL") {
        if !url.is_empty() {
            hl_config.base_url = url;
        }
    }
    info!(base_url = %hl_config.base_url, "Hyperliquid data source configured");
    let client = HyperliquidClient::new(hl_config)?;

    // 시그널 생성기 및 AppState 생성
    let generator = SignalGenerator::new(
        Arc::new(client),
        GeneratorConfig::from(config.signal.clone()),
    );
    let state = Arc::new(AppState::new(generator, &config.signal)?);

    info!(
        version = %state.version,
        default_symbols = ?state.default_symbols,
        default_timeframes = ?state.default_timeframes,
        "Application state initialized"
    );

    // 라우터 생성
    let app = create_router(state, metrics_handle);

    // 서버 시작
    info!(%addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", addr);
    info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료를 시작합니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
