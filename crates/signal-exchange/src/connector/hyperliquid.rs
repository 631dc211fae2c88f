//! Hyperliquid 거래소 커넥터.
//!
//! Hyperliquid 공개 info 엔드포인트에서 퍼페추얼 캔들 데이터를 조회합니다.
//! 인증이 필요 없는 읽기 전용 커넥터입니다.

use crate::error::ExchangeError;
use crate::traits::{CandleSource, SourceResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use signal_core::{Candle, CandleSeries, Symbol, Timeframe};
use std::time::Duration;
use tracing::{debug, error, warn};

// ============================================================================
// 설정
// ============================================================================

/// Hyperliquid 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct HyperliquidConfig {
    /// info 엔드포인트 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 일시적 네트워크 오류 시 1회 재시도 여부
    pub retry_transient: bool,
}

impl Default for HyperliquidConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.hyperliquid.xyz".to_string(),
            timeout_secs: 10,
            retry_transient: true,
        }
    }
}

impl HyperliquidConfig {
    /// 새 설정 생성.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// 환경 변수에서 생성.
    ///
    /// `HYPERLIQUID_API_URL`이 설정되어 있으면 해당 URL을 사용하고,
    /// 없으면 메인넷 기본값을 사용합니다.
    pub fn from_env() -> Self {
        match std::env::var("HYPERLIQUID_API_URL") {
            Ok(url) if !url.is_empty() => Self::new(url),
            _ => Self::default(),
        }
    }
}

impl From<signal_core::HyperliquidSettings> for HyperliquidConfig {
    fn from(settings: signal_core::HyperliquidSettings) -> Self {
        Self {
            base_url: settings.base_url,
            timeout_secs: settings.timeout_secs,
            retry_transient: settings.retry_transient,
        }
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

/// candleSnapshot 응답의 캔들 한 개.
#[derive(Debug, Deserialize)]
struct HlCandle {
    /// 시작 시간 (epoch ms)
    t: i64,
    /// 종료 시간 (epoch ms)
    #[serde(rename = "T")]
    close_time: i64,
    /// 시가
    o: String,
    /// 고가
    h: String,
    /// 저가
    l: String,
    /// 종가
    c: String,
    /// 거래량
    v: String,
}

/// meta 응답의 자산 항목.
#[derive(Debug, Deserialize)]
struct HlAsset {
    name: String,
}

/// meta 응답 (퍼프 유니버스).
#[derive(Debug, Deserialize)]
struct HlMeta {
    universe: Vec<HlAsset>,
}

// ============================================================================
// Hyperliquid 클라이언트
// ============================================================================

/// Hyperliquid 마켓 데이터 클라이언트.
pub struct HyperliquidClient {
    config: HyperliquidConfig,
    client: Client,
}

impl HyperliquidClient {
    /// 새 Hyperliquid 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::Network`를 반환합니다.
    pub fn new(config: HyperliquidConfig) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 환경 변수 설정으로 생성.
    pub fn from_env() -> Result<Self, ExchangeError> {
        Self::new(HyperliquidConfig::from_env())
    }

    /// info 엔드포인트에 POST 요청을 보내고 응답을 역직렬화합니다.
    async fn post_info<T: for<'de> Deserialize<'de>>(
        &self,
        body: &serde_json::Value,
    ) -> SourceResult<T> {
        let url = format!("{}/info", self.config.base_url);
        debug!("POST {} ({})", url, body["type"]);

        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                error!("Failed to parse response: {} - Body: {}", e, text);
                ExchangeError::Parse(e.to_string())
            })
        } else {
            Err(ExchangeError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// candleSnapshot 요청 (재시도 포함).
    async fn candle_snapshot(
        &self,
        coin: &str,
        interval: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> SourceResult<Vec<HlCandle>> {
        let body = json!({
            "type": "candleSnapshot",
            "req": {
                "coin": coin,
                "interval": interval,
                "startTime": start_ms,
                "endTime": end_ms,
            }
        });

        match self.post_info(&body).await {
            Err(e) if self.config.retry_transient && e.is_retryable() => {
                let delay = e.retry_delay_ms().unwrap_or(500);
                warn!(coin, interval, error = %e, delay_ms = delay, "Retrying candle snapshot");
                tokio::time::sleep(Duration::from_millis(delay)).await;
                self.post_info(&body).await
            }
            other => other,
        }
    }

    /// 퍼프 유니버스에 심볼이 존재하는지 확인합니다.
    async fn symbol_exists(&self, coin: &str) -> SourceResult<bool> {
        let meta: HlMeta = self.post_info(&json!({ "type": "meta" })).await?;
        Ok(meta.universe.iter().any(|a| a.name == coin))
    }

    /// 문자열 필드에서 Decimal 파싱.
    fn parse_decimal(value: &str, field: &str) -> SourceResult<Decimal> {
        value
            .parse()
            .map_err(|e| ExchangeError::Parse(format!("{} 필드 파싱 실패 ({}): {}", field, value, e)))
    }

    /// 응답 캔들 한 개를 도메인 캔들로 변환합니다.
    fn to_candle(raw: &HlCandle) -> SourceResult<Candle> {
        let open_time = DateTime::from_timestamp_millis(raw.t)
            .ok_or_else(|| ExchangeError::Parse(format!("유효하지 않은 시작 시간: {}", raw.t)))?;
        let close_time = DateTime::from_timestamp_millis(raw.close_time).ok_or_else(|| {
            ExchangeError::Parse(format!("유효하지 않은 종료 시간: {}", raw.close_time))
        })?;

        Ok(Candle {
            open_time,
            open: Self::parse_decimal(&raw.o, "open")?,
            high: Self::parse_decimal(&raw.h, "high")?,
            low: Self::parse_decimal(&raw.l, "low")?,
            close: Self::parse_decimal(&raw.c, "close")?,
            volume: Self::parse_decimal(&raw.v, "volume")?,
            close_time,
        })
    }
}

#[async_trait]
impl CandleSource for HyperliquidClient {
    fn name(&self) -> &str {
        "hyperliquid"
    }

    /// 마감된 캔들 시리즈를 조회합니다.
    ///
    /// 진행 중인(종료 시간이 아직 지나지 않은) 캔들은 제외합니다. 지표가
    /// 미마감 봉을 포함하면 마지막 값이 봉 마감 때까지 계속 바뀌기 때문에,
    /// 시그널은 항상 한 봉 늦게, 확정된 데이터로만 계산됩니다.
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        lookback: usize,
    ) -> SourceResult<CandleSeries> {
        let now = Utc::now();
        let end_ms = now.timestamp_millis();
        let window_ms = (timeframe.as_secs() as i64) * 1000 * (lookback as i64 + 1);
        let start_ms = end_ms - window_ms;

        let raw = self
            .candle_snapshot(symbol.as_str(), timeframe.to_interval(), start_ms, end_ms)
            .await?;

        if raw.is_empty() {
            // 빈 응답은 미지원 심볼일 수 있으므로 유니버스에서 확인
            return if self.symbol_exists(symbol.as_str()).await? {
                Err(ExchangeError::EmptyData(format!(
                    "{} {} 캔들 없음",
                    symbol, timeframe
                )))
            } else {
                Err(ExchangeError::SymbolNotFound(symbol.to_string()))
            };
        }

        let mut candles = Vec::with_capacity(raw.len());
        for row in &raw {
            let candle = Self::to_candle(row)?;
            // 마감된 캔들만 유지
            if candle.close_time <= now {
                candles.push(candle);
            }
        }

        if candles.is_empty() {
            return Err(ExchangeError::EmptyData(format!(
                "{} {} 마감된 캔들 없음",
                symbol, timeframe
            )));
        }

        let series = CandleSeries::from_candles(symbol.clone(), timeframe, candles);
        let series = if series.len() > lookback {
            CandleSeries::from_candles(symbol.clone(), timeframe, series.tail(lookback).to_vec())
        } else {
            series
        };

        debug!(
            symbol = %symbol,
            timeframe = %timeframe,
            count = series.len(),
            "Fetched candle series"
        );

        Ok(series)
    }
}
