//! 통합 API 에러 응답 타입.
//!
//! 파이프라인 에러를 클라이언트 상태 코드로 매핑합니다:
//! - `InvalidRequest` → 400
//! - `UnknownSymbol` → 404
//! - `InsufficientData` → 422
//! - `DataUnavailable` → 502

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use signal_core::SignalError;
use utoipa::ToSchema;

/// JSON 에러 응답 본문.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// 한 줄 에러 메시지
    pub error: String,
}

/// 핸들러에서 반환되는 API 에러.
#[derive(Debug)]
pub struct ApiError(pub SignalError);

impl ApiError {
    /// 에러 변형에 대응하는 상태 코드를 반환합니다.
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            SignalError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SignalError::UnknownSymbol(_) => StatusCode::NOT_FOUND,
            SignalError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SignalError::DataUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<SignalError> for ApiError {
    fn from(err: SignalError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}
