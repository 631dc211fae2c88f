//! 시그널 페이로드 및 관련 타입.
//!
//! 이 모듈은 시그널 파이프라인의 출력 타입을 정의합니다:
//! - `IndicatorSnapshot` - 캔들별 기술 지표 값
//! - `PriceActionContext` - 패턴/지지·저항/거래량/추세 컨텍스트
//! - `Signal` - (심볼, 타임프레임)별 최종 시그널
//!
//! 직렬화는 원본 대시보드 페이로드 규약에 따라 camelCase를 사용합니다.

use crate::types::{Symbol, Timeframe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 시그널 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// 롱 (매수)
    Long,
    /// 숏 (매도)
    Short,
    /// 중립 (관망)
    Neutral,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "Long"),
            Direction::Short => write!(f, "Short"),
            Direction::Neutral => write!(f, "Neutral"),
        }
    }
}

/// 추세 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// 상승 추세
    Up,
    /// 하락 추세
    Down,
    /// 횡보
    Sideways,
    /// 판단 불가 (상위 타임프레임 데이터 없음)
    Unknown,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Up => write!(f, "up"),
            Trend::Down => write!(f, "down"),
            Trend::Sideways => write!(f, "sideways"),
            Trend::Unknown => write!(f, "unknown"),
        }
    }
}

/// 캔들 패턴 편향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternBias {
    /// 상승 편향
    Bullish,
    /// 하락 편향
    Bearish,
    /// 중립
    Neutral,
}

/// 패턴 강도.
///
/// 3봉 연속 패턴은 강함, 장악형/핀바는 보통, 도지/인사이드 바는 약함으로
/// 분류됩니다. 약한 패턴은 방향 결정에 사용되지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternStrength {
    /// 약함
    Weak,
    /// 보통
    Moderate,
    /// 강함
    Strong,
}

/// 감지된 캔들스틱 패턴.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandlePattern {
    /// 패턴 이름 (예: "Bullish Engulfing")
    pub name: String,
    /// 패턴 편향
    pub bias: PatternBias,
    /// 패턴 강도
    pub strength: PatternStrength,
    /// 패턴을 구성하는 캔들 수
    pub candle_count: usize,
}

/// 캔들 하나에 대한 기술 지표 값.
///
/// 모든 필드는 f64이며, 지표 웜업이 끝나기 전 인덱스에서는 NaN입니다.
/// serde_json은 비유한 값을 null로 직렬화합니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    /// EMA(20)
    pub ema20: f64,
    /// EMA(50)
    pub ema50: f64,
    /// ADX(14)
    pub adx: f64,
    /// +DI(14)
    pub plus_di: f64,
    /// -DI(14)
    pub minus_di: f64,
    /// MACD 선 (EMA12 - EMA26)
    pub macd_line: f64,
    /// MACD 시그널 선 (MACD의 EMA9)
    pub macd_signal: f64,
    /// MACD 히스토그램
    pub macd_hist: f64,
    /// RSI(14)
    pub rsi: f64,
    /// ATR(14)
    pub atr: f64,
    /// 종가
    pub close: f64,
}

/// 타임프레임별 가격 행동 컨텍스트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceActionContext {
    /// 최우선 순위로 매칭된 캔들 패턴
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<CandlePattern>,
    /// 현재 종가 아래 가장 가까운 피벗 지지선
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support: Option<f64>,
    /// 현재 종가 위 가장 가까운 피벗 저항선
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resistance: Option<f64>,
    /// 최근 거래량 / 직전 구간 평균 거래량
    pub volume_ratio: f64,
    /// 현재 타임프레임 추세
    pub timeframe_trend: Trend,
    /// 상위 타임프레임 추세
    pub higher_timeframe_trend: Trend,
    /// 자연어 요약
    pub summary: String,
}

/// (심볼, 타임프레임)별 최종 시그널.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    /// 거래 심볼
    pub symbol: Symbol,
    /// 타임프레임
    pub timeframe: Timeframe,
    /// 시그널 방향
    pub direction: Direction,
    /// 진입가 (최근 종가)
    pub entry: f64,
    /// 손절가 - 중립 시그널에서는 생략
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    /// 목표가 - 중립 시그널에서는 생략
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    /// 지표 정합성 기반 신뢰도 (0~100)
    pub confidence: f64,
    /// 최신 캔들의 지표 스냅샷
    pub indicators: IndicatorSnapshot,
    /// 가격 행동 컨텍스트
    pub price_action: PriceActionContext,
    /// 대시보드 차트용 최근 종가 (최대 100개)
    pub price_history: Vec<f64>,
    /// 시그널 생성 시간
    pub generated_at: DateTime<Utc>,
    /// 사람이 읽을 수 있는 텍스트 블록
    pub formatted: String,
}

/// (심볼, 타임프레임) 한 쌍의 실패 정보.
///
/// 다중 심볼/타임프레임 요청에서 일부 쌍의 실패가 전체 요청을 중단시키지
/// 않도록, 실패는 응답 행으로 표현됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalFailure {
    /// 거래 심볼
    pub symbol: Symbol,
    /// 타임프레임
    pub timeframe: Timeframe,
    /// 한 줄 에러 메시지
    pub error: String,
}

/// 시그널 또는 실패 행.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalOutcome {
    /// 생성된 시그널
    Ok(Box<Signal>),
    /// 해당 쌍의 실패
    Err(SignalFailure),
}

impl SignalOutcome {
    /// 시그널이면 참조를 반환합니다.
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            SignalOutcome::Ok(signal) => Some(signal),
            SignalOutcome::Err(_) => None,
        }
    }

    /// 실패 행인지 확인합니다.
    pub fn is_err(&self) -> bool {
        matches!(self, SignalOutcome::Err(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema20: 101.0,
            ema50: 100.0,
            adx: 25.0,
            plus_di: 28.0,
            minus_di: 12.0,
            macd_line: 0.8,
            macd_signal: 0.5,
            macd_hist: 0.3,
            rsi: 58.0,
            atr: 2.0,
            close: 102.0,
        }
    }

    #[test]
    fn test_signal_serializes_camel_case() {
        let signal = Signal {
            symbol: Symbol::perp("BTC").unwrap(),
            timeframe: Timeframe::H1,
            direction: Direction::Long,
            entry: 102.0,
            stop_loss: Some(99.0),
            take_profit: Some(108.0),
            confidence: 85.0,
            indicators: snapshot(),
            price_action: PriceActionContext {
                pattern: None,
                support: Some(98.5),
                resistance: None,
                volume_ratio: 1.2,
                timeframe_trend: Trend::Up,
                higher_timeframe_trend: Trend::Unknown,
                summary: "test".to_string(),
            },
            price_history: vec![100.0, 101.0, 102.0],
            generated_at: Utc::now(),
            formatted: "text".to_string(),
        };

        let value = serde_json::to_value(&signal).unwrap();
        assert_eq!(value["stopLoss"], 99.0);
        assert_eq!(value["takeProfit"], 108.0);
        assert_eq!(value["direction"], "long");
        assert_eq!(value["priceAction"]["volumeRatio"], 1.2);
        assert_eq!(value["priceAction"]["higherTimeframeTrend"], "unknown");
        assert!(value["priceAction"].get("resistance").is_none());
    }

    #[test]
    fn test_outcome_untagged_serialization() {
        let failure = SignalOutcome::Err(SignalFailure {
            symbol: Symbol::perp("BTC").unwrap(),
            timeframe: Timeframe::M15,
            error: "데이터 조회 실패: timeout".to_string(),
        });

        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["timeframe"], "15m");
        assert!(value["error"].is_string());
    }

    #[test]
    fn test_pattern_strength_ordering() {
        assert!(PatternStrength::Strong > PatternStrength::Moderate);
        assert!(PatternStrength::Moderate > PatternStrength::Weak);
    }
}
