//! 가격 행동 평가.
//!
//! 최근 캔들에서 캔들스틱 패턴, 피벗 기반 지지/저항, 거래량 스파이크,
//! 타임프레임 추세를 평가합니다. 이 단계는 전체 요청을 실패시키지 않고
//! 데이터가 부족한 항목을 생략하는 방식으로 degrade됩니다.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use signal_core::{
    Candle, CandlePattern, CandleSeries, IndicatorSnapshot, PatternBias, PatternStrength,
    PriceActionContext, Trend,
};

use crate::indicators;

/// 피벗/패턴 평가에 사용하는 트레일링 캔들 수.
const EVALUATION_WINDOW: usize = 50;
/// 피벗 판정 시 양쪽에서 비교할 이웃 캔들 수.
const PIVOT_NEIGHBORS: usize = 2;
/// 거래량 기준 구간 (최신 캔들 제외).
const VOLUME_WINDOW: usize = 20;
/// 거래량 스파이크로 플래그되는 배수.
pub const VOLUME_SPIKE_RATIO: f64 = 1.5;

/// 캔들 시리즈의 가격 행동 컨텍스트를 평가합니다.
///
/// `snapshots`는 같은 시리즈에 대해 계산된 지표 컬럼이며, 추세 판정에
/// EMA20/EMA50을 사용합니다. 상위 타임프레임 시리즈가 없거나 너무 짧으면
/// 상위 추세는 `Unknown`으로 남습니다.
pub fn evaluate(
    series: &CandleSeries,
    snapshots: &[IndicatorSnapshot],
    higher_series: Option<&CandleSeries>,
) -> PriceActionContext {
    let window = series.tail(EVALUATION_WINDOW);

    let pattern = detect_pattern(series.candles());
    let (support, resistance) = pivot_levels(window);
    let volume_ratio = volume_ratio(series);
    let timeframe_trend = trend_from_snapshots(snapshots);
    let higher_timeframe_trend = higher_series.map(higher_trend).unwrap_or(Trend::Unknown);

    let summary = build_summary(
        series,
        pattern.as_ref(),
        support,
        resistance,
        volume_ratio,
        timeframe_trend,
        higher_timeframe_trend,
    );

    PriceActionContext {
        pattern,
        support,
        resistance,
        volume_ratio,
        timeframe_trend,
        higher_timeframe_trend,
        summary,
    }
}

// ============================================================================
// 캔들 패턴
// ============================================================================

/// 최근 1~3개 캔들에서 우선순위가 가장 높은 패턴 하나를 감지합니다.
///
/// 우선순위: 3봉 연속 패턴 > 장악형 > 핀바 > 인사이드 바 > 도지.
fn detect_pattern(candles: &[Candle]) -> Option<CandlePattern> {
    if candles.len() < 3 {
        return None;
    }

    let last = &candles[candles.len() - 1];
    let prev = &candles[candles.len() - 2];
    let first = &candles[candles.len() - 3];

    if is_three_white_soldiers(first, prev, last) {
        return Some(pattern("Three White Soldiers", PatternBias::Bullish, PatternStrength::Strong, 3));
    }
    if is_three_black_crows(first, prev, last) {
        return Some(pattern("Three Black Crows", PatternBias::Bearish, PatternStrength::Strong, 3));
    }
    if is_bullish_engulfing(prev, last) {
        return Some(pattern("Bullish Engulfing", PatternBias::Bullish, PatternStrength::Moderate, 2));
    }
    if is_bearish_engulfing(prev, last) {
        return Some(pattern("Bearish Engulfing", PatternBias::Bearish, PatternStrength::Moderate, 2));
    }
    if is_bullish_pin_bar(last) {
        return Some(pattern("Hammer (Pin Bar)", PatternBias::Bullish, PatternStrength::Moderate, 1));
    }
    if is_bearish_pin_bar(last) {
        return Some(pattern(
            "Shooting Star (Pin Bar)",
            PatternBias::Bearish,
            PatternStrength::Moderate,
            1,
        ));
    }
    if is_inside_bar(prev, last) {
        return Some(pattern("Inside Bar", PatternBias::Neutral, PatternStrength::Weak, 2));
    }
    if is_doji(last) {
        return Some(pattern("Doji", PatternBias::Neutral, PatternStrength::Weak, 1));
    }
    None
}

fn pattern(
    name: &str,
    bias: PatternBias,
    strength: PatternStrength,
    candle_count: usize,
) -> CandlePattern {
    CandlePattern {
        name: name.to_string(),
        bias,
        strength,
        candle_count,
    }
}

/// Three White Soldiers: 양봉 3개, 시가와 종가가 모두 상승.
fn is_three_white_soldiers(first: &Candle, mid: &Candle, last: &Candle) -> bool {
    first.is_bullish()
        && mid.is_bullish()
        && last.is_bullish()
        && mid.open > first.open
        && last.open > mid.open
        && mid.close > first.close
        && last.close > mid.close
}

/// Three Black Crows: 음봉 3개, 시가와 종가가 모두 하락.
fn is_three_black_crows(first: &Candle, mid: &Candle, last: &Candle) -> bool {
    first.is_bearish()
        && mid.is_bearish()
        && last.is_bearish()
        && mid.open < first.open
        && last.open < mid.open
        && mid.close < first.close
        && last.close < mid.close
}

/// Bullish Engulfing: 음봉 뒤 양봉이 직전 몸통을 감쌈.
fn is_bullish_engulfing(prev: &Candle, last: &Candle) -> bool {
    prev.is_bearish() && last.is_bullish() && last.open <= prev.close && last.close >= prev.open
}

/// Bearish Engulfing: 양봉 뒤 음봉이 직전 몸통을 감쌈.
fn is_bearish_engulfing(prev: &Candle, last: &Candle) -> bool {
    prev.is_bullish() && last.is_bearish() && last.open >= prev.close && last.close <= prev.open
}

/// Hammer: 하단 꼬리가 범위의 절반 이상이면서 몸통의 2배 이상인 양봉.
fn is_bullish_pin_bar(candle: &Candle) -> bool {
    let total = candle.range();
    if total == Decimal::ZERO {
        return false;
    }
    let body = candle.body_size();
    let lower = candle.lower_shadow();
    let upper = candle.upper_shadow();

    candle.is_bullish()
        && lower >= total * dec!(0.5)
        && lower >= body * dec!(2)
        && upper <= total * dec!(0.3)
}

/// Shooting Star: 상단 꼬리가 범위의 절반 이상이면서 몸통의 2배 이상인 음봉.
fn is_bearish_pin_bar(candle: &Candle) -> bool {
    let total = candle.range();
    if total == Decimal::ZERO {
        return false;
    }
    let body = candle.body_size();
    let lower = candle.lower_shadow();
    let upper = candle.upper_shadow();

    candle.is_bearish()
        && upper >= total * dec!(0.5)
        && upper >= body * dec!(2)
        && lower <= total * dec!(0.3)
}

/// Inside Bar: 마지막 캔들의 범위가 직전 캔들 범위 안에 포함됨.
fn is_inside_bar(prev: &Candle, last: &Candle) -> bool {
    last.high <= prev.high && last.low >= prev.low
}

/// Doji: 몸통이 전체 범위의 10% 이하.
fn is_doji(candle: &Candle) -> bool {
    let total = candle.range();
    if total == Decimal::ZERO {
        return false;
    }
    candle.body_size() <= total * dec!(0.1)
}

// ============================================================================
// 지지 / 저항
// ============================================================================

/// 트레일링 윈도우에서 피벗 기반 지지/저항을 찾습니다.
///
/// 캔들 i는 양쪽 `PIVOT_NEIGHBORS`개 캔들보다 고가가 높으면 피벗 고점,
/// 저가가 낮으면 피벗 저점입니다. 현재 종가 아래에서 가장 가까운 피벗
/// 저점이 지지선, 위에서 가장 가까운 피벗 고점이 저항선입니다.
fn pivot_levels(window: &[Candle]) -> (Option<f64>, Option<f64>) {
    let k = PIVOT_NEIGHBORS;
    if window.len() < 2 * k + 1 {
        return (None, None);
    }

    let Some(close) = window.last().and_then(|c| c.close.to_f64()) else {
        return (None, None);
    };

    let mut support: Option<f64> = None;
    let mut resistance: Option<f64> = None;

    for i in k..window.len() - k {
        let candle = &window[i];
        let neighbors = window[i - k..i].iter().chain(window[i + 1..=i + k].iter());

        let mut pivot_high = true;
        let mut pivot_low = true;
        for other in neighbors {
            if other.high >= candle.high {
                pivot_high = false;
            }
            if other.low <= candle.low {
                pivot_low = false;
            }
        }

        if pivot_high {
            if let Some(high) = candle.high.to_f64() {
                if high > close && resistance.map_or(true, |r| high < r) {
                    resistance = Some(high);
                }
            }
        }
        if pivot_low {
            if let Some(low) = candle.low.to_f64() {
                if low < close && support.map_or(true, |s| low > s) {
                    support = Some(low);
                }
            }
        }
    }

    (support, resistance)
}

// ============================================================================
// 거래량 / 추세
// ============================================================================

/// 최근 거래량을 직전 구간 평균으로 나눈 비율을 계산합니다.
fn volume_ratio(series: &CandleSeries) -> f64 {
    let volumes = series.volumes();
    let Some((&latest, rest)) = volumes.split_last() else {
        return 1.0;
    };
    if rest.is_empty() {
        return 1.0;
    }

    let window = &rest[rest.len().saturating_sub(VOLUME_WINDOW)..];
    let baseline = window.iter().sum::<f64>() / window.len() as f64;
    if baseline <= 0.0 {
        return 1.0;
    }
    latest / baseline
}

/// EMA20/EMA50 관계와 EMA20 기울기에서 추세를 판정합니다.
fn trend_from_snapshots(snapshots: &[IndicatorSnapshot]) -> Trend {
    let n = snapshots.len();
    if n < 2 {
        return Trend::Sideways;
    }
    let last = &snapshots[n - 1];
    let prev = &snapshots[n - 2];
    if !last.ema20.is_finite() || !last.ema50.is_finite() || !prev.ema20.is_finite() {
        return Trend::Sideways;
    }

    if last.ema20 > last.ema50 && last.ema20 > prev.ema20 {
        Trend::Up
    } else if last.ema20 < last.ema50 && last.ema20 < prev.ema20 {
        Trend::Down
    } else {
        Trend::Sideways
    }
}

/// 상위 타임프레임 시리즈의 추세를 같은 규칙으로 판정합니다.
///
/// EMA50 웜업을 채우지 못하면 `Unknown`입니다.
fn higher_trend(series: &CandleSeries) -> Trend {
    let closes = series.closes();
    let ema20 = indicators::ema(&closes, 20);
    let ema50 = indicators::ema(&closes, 50);
    let n = closes.len();
    if n < 2 {
        return Trend::Unknown;
    }

    let (e20, e20_prev, e50) = (ema20[n - 1], ema20[n - 2], ema50[n - 1]);
    if !e20.is_finite() || !e20_prev.is_finite() || !e50.is_finite() {
        return Trend::Unknown;
    }

    if e20 > e50 && e20 > e20_prev {
        Trend::Up
    } else if e20 < e50 && e20 < e20_prev {
        Trend::Down
    } else {
        Trend::Sideways
    }
}

// ============================================================================
// 요약
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn build_summary(
    series: &CandleSeries,
    pattern: Option<&CandlePattern>,
    support: Option<f64>,
    resistance: Option<f64>,
    volume_ratio: f64,
    timeframe_trend: Trend,
    higher_timeframe_trend: Trend,
) -> String {
    let mut bits: Vec<String> = Vec::new();

    match pattern {
        Some(p) => {
            let bias = match p.bias {
                PatternBias::Bullish => "Bullish",
                PatternBias::Bearish => "Bearish",
                PatternBias::Neutral => "Neutral",
            };
            bits.push(format!("{} bias via {}", bias, p.name));
        }
        None => bits.push("No dominant candlestick pattern".to_string()),
    }

    if timeframe_trend != Trend::Sideways {
        bits.push(format!(
            "{} structure {}",
            series.timeframe.to_interval().to_uppercase(),
            timeframe_trend
        ));
    }

    if higher_timeframe_trend != Trend::Unknown {
        bits.push(format!("Higher TF bias {}", higher_timeframe_trend));
    }

    if let Some(level) = support {
        bits.push(format!("Support ~{:.2}", level));
    }
    if let Some(level) = resistance {
        bits.push(format!("Resistance ~{:.2}", level));
    }

    if volume_ratio >= VOLUME_SPIKE_RATIO {
        bits.push(format!("Volume spike x{:.2}", volume_ratio));
    }

    bits.join("; ")
}
