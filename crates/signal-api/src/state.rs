//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! `AppState`는 Arc로 래핑되어 Axum의 State extractor를 통해 핸들러에
//! 주입됩니다. 시그널 생성기 외의 공유 가변 상태는 없습니다.

use chrono::{DateTime, Utc};
use signal_core::{SignalResult, SignalSettings, Symbol, Timeframe};
use signal_engine::SignalGenerator;

/// 애플리케이션 공유 상태.
pub struct AppState {
    /// 시그널 생성기 - 조회/지표/합성 파이프라인
    pub generator: SignalGenerator,

    /// 쿼리 파라미터 생략 시 사용할 기본 심볼
    pub default_symbols: Vec<Symbol>,

    /// 쿼리 파라미터 생략 시 사용할 기본 타임프레임
    pub default_timeframes: Vec<Timeframe>,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: DateTime<Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    ///
    /// # Errors
    /// 설정의 기본 심볼/타임프레임 문자열이 유효하지 않으면
    /// `InvalidRequest`를 반환합니다.
    pub fn new(generator: SignalGenerator, settings: &SignalSettings) -> SignalResult<Self> {
        let default_symbols = settings
            .default_symbols
            .iter()
            .map(|s| Symbol::perp(s))
            .collect::<SignalResult<Vec<_>>>()?;

        let default_timeframes = settings
            .default_timeframes
            .iter()
            .map(|s| {
                s.parse::<Timeframe>()
                    .map_err(signal_core::SignalError::InvalidRequest)
            })
            .collect::<SignalResult<Vec<_>>>()?;

        Ok(Self {
            generator,
            default_symbols,
            default_timeframes,
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// 서버 업타임(초)을 반환합니다.
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

#[cfg(test)]
pub use test_support::create_test_state;
