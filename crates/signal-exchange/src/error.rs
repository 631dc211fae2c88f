//! 거래소 에러 타입.

use signal_core::SignalError;
use thiserror::Error;

/// 거래소 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),

    /// 심볼을 찾을 수 없음
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// 업스트림이 빈 캔들 시리즈 반환
    #[error("Empty candle data: {0}")]
    EmptyData(String),

    /// API 에러 응답
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
}

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExchangeError::Network(_) | ExchangeError::Timeout(_))
            || matches!(self, ExchangeError::Api { status, .. } if *status >= 500)
    }

    /// 권장 재시도 대기 시간(밀리초) 반환.
    pub fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            ExchangeError::Network(_) => Some(1000),
            ExchangeError::Timeout(_) => Some(500),
            ExchangeError::Api { status, .. } if *status >= 500 => Some(1000),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else if err.is_decode() {
            ExchangeError::Parse(err.to_string())
        } else {
            ExchangeError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Parse(err.to_string())
    }
}

impl From<ExchangeError> for SignalError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::SymbolNotFound(coin) => SignalError::UnknownSymbol(coin),
            other => SignalError::DataUnavailable(other.to_string()),
        }
    }
}
