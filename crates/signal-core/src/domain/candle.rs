//! OHLCV 캔들 데이터 구조체.
//!
//! 이 모듈은 캔들 관련 타입을 정의합니다:
//! - `Candle` - 단일 OHLCV 캔들
//! - `CandleSeries` - 한 (심볼, 타임프레임)의 시간 오름차순 캔들 시퀀스

use crate::types::{Symbol, Timeframe};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLCV 캔들스틱 데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 캔들 시작 시간
    pub open_time: DateTime<Utc>,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량 (기준 자산 단위)
    pub volume: Decimal,
    /// 캔들 종료 시간
    pub close_time: DateTime<Utc>,
}

impl Candle {
    /// 캔들 몸통 크기(절대값)를 반환합니다.
    pub fn body_size(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    /// 캔들 범위(고가 - 저가)를 반환합니다.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 상단 꼬리 크기를 반환합니다.
    pub fn upper_shadow(&self) -> Decimal {
        self.high - self.close.max(self.open)
    }

    /// 하단 꼬리 크기를 반환합니다.
    pub fn lower_shadow(&self) -> Decimal {
        self.close.min(self.open) - self.low
    }

    /// 양봉(종가 > 시가)인지 확인합니다.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 음봉(종가 < 시가)인지 확인합니다.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// 한 (심볼, 타임프레임)의 캔들 시퀀스.
///
/// 시작 시간 기준 엄격한 오름차순과 중복 제거가 생성 시점에 보장됩니다.
/// 생성 이후에는 읽기 전용으로 취급됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleSeries {
    /// 거래 심볼
    pub symbol: Symbol,
    /// 타임프레임
    pub timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// 캔들 목록에서 시리즈를 생성합니다.
    ///
    /// 시작 시간 기준으로 정렬하고 중복 캔들을 제거합니다.
    pub fn from_candles(symbol: Symbol, timeframe: Timeframe, mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.open_time);
        candles.dedup_by_key(|c| c.open_time);
        Self {
            symbol,
            timeframe,
            candles,
        }
    }

    /// 캔들 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// 시리즈가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// 캔들 슬라이스를 반환합니다.
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// 마지막(최신) 캔들을 반환합니다.
    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// 최근 `n`개 캔들 슬라이스를 반환합니다.
    pub fn tail(&self, n: usize) -> &[Candle] {
        let start = self.candles.len().saturating_sub(n);
        &self.candles[start..]
    }

    /// 종가 컬럼을 f64로 반환합니다 (지표 계산용).
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| decimal_to_f64(c.close)).collect()
    }

    /// 고가 컬럼을 f64로 반환합니다.
    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| decimal_to_f64(c.high)).collect()
    }

    /// 저가 컬럼을 f64로 반환합니다.
    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| decimal_to_f64(c.low)).collect()
    }

    /// 거래량 컬럼을 f64로 반환합니다.
    pub fn volumes(&self) -> Vec<f64> {
        self.candles
            .iter()
            .map(|c| decimal_to_f64(c.volume))
            .collect()
    }
}

/// Decimal을 f64로 변환합니다. 표현 불가능한 값은 0으로 처리됩니다.
fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
