//! 캔들 데이터 소스 트레이트.

use crate::ExchangeError;
use async_trait::async_trait;
use signal_core::{CandleSeries, Symbol, Timeframe};

/// 캔들 소스 작업 Result 타입.
pub type SourceResult<T> = Result<T, ExchangeError>;

/// 거래소 중립적인 캔들 데이터 소스.
///
/// 시그널 엔진은 이 트레이트를 통해서만 시장 데이터에 접근하므로,
/// 테스트에서는 고정 시리즈를 반환하는 스텁으로 대체할 수 있습니다.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// 소스 이름 (로깅용).
    fn name(&self) -> &str;

    /// 마감된 캔들 시리즈를 조회합니다.
    ///
    /// # 보장
    /// - 시작 시간 기준 오름차순, 중복 없음
    /// - 진행 중인(미마감) 캔들은 포함되지 않음
    /// - 최대 `lookback`개의 최신 캔들
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        lookback: usize,
    ) -> SourceResult<CandleSeries>;
}
