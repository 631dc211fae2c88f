//! 시그널 생성 오케스트레이션.
//!
//! (심볼, 타임프레임)별로 조회 → 지표 → 가격 행동 → 합성 → 포맷 파이프라인을
//! 실행합니다. 배치 요청의 각 쌍은 독립적으로 병렬 계산되며, 한 쌍의 실패가
//! 나머지를 중단시키지 않습니다.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use signal_core::{
    CandleSeries, Signal, SignalError, SignalFailure, SignalOutcome, SignalResult, SignalSettings,
    Symbol, Timeframe,
};
use signal_exchange::CandleSource;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{formatter, indicators, price_action, synthesizer};

/// 대시보드 차트에 포함할 최근 종가 수.
const PRICE_HISTORY_LEN: usize = 100;

/// 시그널 생성기 설정.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// 기본 시리즈 캔들 수
    pub lookback: usize,
    /// 상위 타임프레임 편향 계산용 캔들 수
    pub higher_timeframe_lookback: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            lookback: 250,
            higher_timeframe_lookback: 120,
        }
    }
}

impl From<SignalSettings> for GeneratorConfig {
    fn from(settings: SignalSettings) -> Self {
        Self {
            lookback: settings.lookback,
            higher_timeframe_lookback: settings.higher_timeframe_lookback,
        }
    }
}

/// 요청 범위의 캔들 조회 메모이제이션.
///
/// 상위 타임프레임 편향이 다른 출력 행에서 이미 조회한 시리즈를 재사용할
/// 때 중복 조회를 피합니다. 락은 조회 중에 잡지 않으므로 동시 요청이 같은
/// 키를 중복 조회할 수 있습니다 (캐시는 정합성이 아니라 절약 목적).
struct FetchCache {
    entries: Mutex<HashMap<(Symbol, Timeframe), CacheEntry>>,
}

struct CacheEntry {
    lookback: usize,
    series: Arc<CandleSeries>,
}

impl FetchCache {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    async fn get_or_fetch(
        &self,
        source: &dyn CandleSource,
        symbol: &Symbol,
        timeframe: Timeframe,
        lookback: usize,
    ) -> SignalResult<Arc<CandleSeries>> {
        let key = (symbol.clone(), timeframe);
        {
            let entries = self.entries.lock().await;
            if let Some(entry) = entries.get(&key) {
                if entry.lookback >= lookback {
                    debug!(symbol = %symbol, timeframe = %timeframe, "Candle cache hit");
                    return Ok(entry.series.clone());
                }
            }
        }

        let series = Arc::new(source.fetch_candles(symbol, timeframe, lookback).await?);

        let mut entries = self.entries.lock().await;
        entries.insert(
            key,
            CacheEntry {
                lookback,
                series: series.clone(),
            },
        );
        Ok(series)
    }
}

/// 시그널 생성기.
///
/// 캔들 소스는 트레이트 객체로 주입되므로 테스트에서는 고정 시리즈를
/// 반환하는 스텁으로 대체할 수 있습니다.
pub struct SignalGenerator {
    source: Arc<dyn CandleSource>,
    config: GeneratorConfig,
}

impl SignalGenerator {
    /// 새 시그널 생성기를 만듭니다.
    pub fn new(source: Arc<dyn CandleSource>, config: GeneratorConfig) -> Self {
        Self { source, config }
    }

    /// 주입된 캔들 소스 이름을 반환합니다 (헬스 체크/로깅용).
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// 한 (심볼, 타임프레임)의 시그널을 생성합니다.
    pub async fn generate(&self, symbol: &Symbol, timeframe: Timeframe) -> SignalResult<Signal> {
        let cache = FetchCache::new();
        self.generate_cached(&cache, symbol, timeframe).await
    }

    /// 한 심볼의 여러 타임프레임 시그널을 병렬로 생성합니다.
    ///
    /// 결과는 입력 타임프레임 순서를 유지하며, 호출자가 실패 유형별로
    /// 다르게 처리할 수 있도록 타입이 있는 에러를 그대로 반환합니다.
    pub async fn generate_many(
        &self,
        symbol: &Symbol,
        timeframes: &[Timeframe],
    ) -> Vec<SignalResult<Signal>> {
        let cache = FetchCache::new();
        join_all(timeframes.iter().map(|timeframe| {
            let cache = &cache;
            async move { self.generate_cached(cache, symbol, *timeframe).await }
        }))
        .await
    }

    /// 여러 심볼/타임프레임의 시그널을 병렬로 생성합니다.
    ///
    /// 반환 맵은 심볼 문자열별로 입력 타임프레임 순서의 행을 담습니다.
    /// 실패한 쌍은 `SignalOutcome::Err` 행으로 표현됩니다.
    pub async fn generate_batch(
        &self,
        symbols: &[Symbol],
        timeframes: &[Timeframe],
    ) -> BTreeMap<String, Vec<SignalOutcome>> {
        let cache = FetchCache::new();
        let pairs: Vec<(Symbol, Timeframe)> = symbols
            .iter()
            .flat_map(|symbol| timeframes.iter().map(move |tf| (symbol.clone(), *tf)))
            .collect();

        let outcomes = join_all(pairs.iter().map(|(symbol, timeframe)| {
            let cache = &cache;
            async move {
                match self.generate_cached(cache, symbol, *timeframe).await {
                    Ok(signal) => SignalOutcome::Ok(Box::new(signal)),
                    Err(error) => {
                        warn!(
                            symbol = %symbol,
                            timeframe = %timeframe,
                            %error,
                            "Signal generation failed"
                        );
                        SignalOutcome::Err(SignalFailure {
                            symbol: symbol.clone(),
                            timeframe: *timeframe,
                            error: error.to_string(),
                        })
                    }
                }
            }
        }))
        .await;

        let mut by_symbol: BTreeMap<String, Vec<SignalOutcome>> = BTreeMap::new();
        for ((symbol, _), outcome) in pairs.iter().zip(outcomes) {
            by_symbol.entry(symbol.to_string()).or_default().push(outcome);
        }
        by_symbol
    }

    async fn generate_cached(
        &self,
        cache: &FetchCache,
        symbol: &Symbol,
        timeframe: Timeframe,
    ) -> SignalResult<Signal> {
        let series = cache
            .get_or_fetch(&*self.source, symbol, timeframe, self.config.lookback)
            .await?;

        let snapshots = indicators::compute_indicators(&series)?;
        let Some(latest) = snapshots.last().copied() else {
            return Err(SignalError::InsufficientData {
                required: indicators::MIN_CANDLES,
                actual: 0,
            });
        };

        // 상위 타임프레임 조회 실패는 편향 unknown으로 degrade
        let higher_series = match timeframe.higher() {
            Some(higher_tf) => {
                match cache
                    .get_or_fetch(
                        &*self.source,
                        symbol,
                        higher_tf,
                        self.config.higher_timeframe_lookback,
                    )
                    .await
                {
                    Ok(series) => Some(series),
                    Err(error) => {
                        warn!(
                            symbol = %symbol,
                            higher_timeframe = %higher_tf,
                            %error,
                            "Higher timeframe fetch failed, bias unknown"
                        );
                        None
                    }
                }
            }
            None => None,
        };

        let context = price_action::evaluate(&series, &snapshots, higher_series.as_deref());

        let closes = series.closes();
        let start = closes.len().saturating_sub(PRICE_HISTORY_LEN);
        let price_history = closes[start..].to_vec();

        let mut signal = synthesizer::synthesize(
            symbol.clone(),
            timeframe,
            &latest,
            context,
            price_history,
            Utc::now(),
        );
        signal.formatted = formatter::format_signal(&signal);

        info!(
            symbol = %symbol,
            timeframe = %timeframe,
            direction = %signal.direction,
            confidence = signal.confidence,
            "Signal generated"
        );

        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use rust_decimal::Decimal;
    use signal_core::Candle;
    use signal_exchange::ExchangeError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 고정 시리즈를 반환하는 스텁 소스.
    struct StubSource {
        series: HashMap<(String, Timeframe), Vec<Candle>>,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new() -> Self {
            Self {
                series: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn with_closes(mut self, coin: &str, timeframe: Timeframe, closes: &[f64]) -> Self {
            let candles = closes
                .iter()
                .enumerate()
                .map(|(i, &close)| Candle {
                    open_time: DateTime::from_timestamp(i as i64 * 3600, 0).unwrap(),
                    open: Decimal::try_from(close - 0.5).unwrap(),
                    high: Decimal::try_from(close + 1.0).unwrap(),
                    low: Decimal::try_from(close - 1.0).unwrap(),
                    close: Decimal::try_from(close).unwrap(),
                    volume: Decimal::from(1000),
                    close_time: DateTime::from_timestamp(i as i64 * 3600 + 3600, 0).unwrap(),
                })
                .collect();
            self.series.insert((coin.to_string(), timeframe), candles);
            self
        }
    }

    #[async_trait]
    impl CandleSource for StubSource {
        fn name(&self) -> &str {
            "stub"
        }

        async fn fetch_candles(
            &self,
            symbol: &Symbol,
            timeframe: Timeframe,
            _lookback: usize,
        ) -> Result<CandleSeries, ExchangeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.series.get(&(symbol.to_string(), timeframe)) {
                Some(candles) => Ok(CandleSeries::from_candles(
                    symbol.clone(),
                    timeframe,
                    candles.clone(),
                )),
                None => Err(ExchangeError::SymbolNotFound(symbol.to_string())),
            }
        }
    }

    fn rising_closes(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[tokio::test]
    async fn test_generate_fills_formatted_text() {
        let source = StubSource::new()
            .with_closes("BTC", Timeframe::D1, &rising_closes(60));
        let generator = SignalGenerator::new(Arc::new(source), GeneratorConfig::default());

        let symbol = Symbol::perp("BTC").unwrap();
        let signal = generator.generate(&symbol, Timeframe::D1).await.unwrap();

        assert!(!signal.formatted.is_empty());
        assert!(signal.formatted.contains("BTC (PERP - 1D)"));
        assert_eq!(signal.price_history.len(), 60);
    }

    #[tokio::test]
    async fn test_batch_memoizes_higher_timeframe_fetch() {
        // 4h 시리즈는 1h의 상위 타임프레임이자 독립 요청 행
        let source = Arc::new(
            StubSource::new()
                .with_closes("BTC", Timeframe::H1, &rising_closes(60))
                .with_closes("BTC", Timeframe::H4, &rising_closes(60))
                .with_closes("BTC", Timeframe::D1, &rising_closes(60)),
        );
        let generator = SignalGenerator::new(source.clone(), GeneratorConfig::default());

        let symbols = vec![Symbol::perp("BTC").unwrap()];
        let timeframes = vec![Timeframe::H4, Timeframe::H1];
        let outcomes = generator.generate_batch(&symbols, &timeframes).await;

        let rows = outcomes.get("BTC").unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| !row.is_err()));

        // H4(기본) + D1(상위) + H1(기본) = 3회, H1의 상위 H4는 캐시 재사용
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_batch_partial_failure() {
        let source = StubSource::new()
            .with_closes("BTC", Timeframe::D1, &rising_closes(60));
        let generator = SignalGenerator::new(Arc::new(source), GeneratorConfig::default());

        let symbols = vec![Symbol::perp("BTC").unwrap(), Symbol::perp("WAT").unwrap()];
        let timeframes = vec![Timeframe::D1];
        let outcomes = generator.generate_batch(&symbols, &timeframes).await;

        assert!(outcomes.get("BTC").unwrap()[0].signal().is_some());
        let failed = &outcomes.get("WAT").unwrap()[0];
        assert!(failed.is_err());
    }

    #[tokio::test]
    async fn test_higher_timeframe_failure_degrades_gracefully() {
        // 1h만 존재, 상위(4h) 조회는 실패
        let source = StubSource::new()
            .with_closes("BTC", Timeframe::H1, &rising_closes(60));
        let generator = SignalGenerator::new(Arc::new(source), GeneratorConfig::default());

        let symbol = Symbol::perp("BTC").unwrap();
        let signal = generator.generate(&symbol, Timeframe::H1).await.unwrap();
        assert_eq!(
            signal.price_action.higher_timeframe_trend,
            signal_core::Trend::Unknown
        );
    }
}
