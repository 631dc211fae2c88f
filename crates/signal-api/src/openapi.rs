//! OpenAPI 문서화 설정.
//!
//! utoipa를 사용하여 REST API의 OpenAPI 3.0 스펙을 생성합니다.
//! Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! 외부 크레이트의 타입(`Signal` 등)은 `#[schema(value_type = Object)]`로
//! JSON 객체로 처리됩니다.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ErrorResponse;
use crate::routes::{ComponentStatus, HealthResponse, SignalsResponse, SymbolSignalsResponse};

/// Signal API 문서.
///
/// 모든 엔드포인트와 스키마를 포함하는 OpenAPI 3.0 스펙입니다.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chumba Finance Signal API",
        version = "0.1.0",
        description = r#"
# Hyperliquid 퍼프 시그널 REST API

Hyperliquid 퍼페추얼 캔들에서 기술 지표와 가격 행동을 계산해
타임프레임별 트레이딩 시그널을 제공합니다.

## 주요 기능

- **시그널 조회**: 심볼/타임프레임별 방향, 레벨, 지표 스냅샷
- **다중 타임프레임**: 15m / 1h / 4h / 1d + 상위 타임프레임 편향
- **부분 성공**: 일부 (심볼, 타임프레임) 실패는 행 단위로 보고
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
        contact(
            name = "Chumba Finance Team",
            url = "https://github.com/user/perp-signals"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "로컬 개발 서버"),
    ),
    tags(
        (name = "health", description = "헬스 체크 - 서버 상태 확인"),
        (name = "signals", description = "트레이딩 시그널 조회"),
    ),
    paths(
        crate::routes::health::health_check,
        crate::routes::health::health_ready,
        crate::routes::signals::get_signals_multi,
        crate::routes::signals::get_symbol_signals,
    ),
    components(schemas(
        ErrorResponse,
        HealthResponse,
        ComponentStatus,
        SignalsResponse,
        SymbolSignalsResponse,
    ))
)]
pub struct ApiDoc;

/// Swagger UI 라우터 생성.
pub fn swagger_ui_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
