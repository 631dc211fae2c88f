//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/signals` - 다중 심볼 시그널 조회
//! - `/signals/{symbol}` - 단일 심볼 시그널 조회

pub mod health;
pub mod signals;

pub use health::{health_router, ComponentStatus, HealthResponse};
pub use signals::{signals_router, SignalsResponse, SymbolSignalsResponse};

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/health", health_router())
        .merge(signals_router())
}
