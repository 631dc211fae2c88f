//! 시그널 합성.
//!
//! 지표 스냅샷과 가격 행동 컨텍스트를 결합하여 방향과 레벨을 결정합니다.
//! 방향 결정은 위에서 아래로 평가되는 규칙 목록이며, 첫 번째로 매칭된
//! 규칙이 승리합니다. 어떤 규칙도 매칭되지 않으면 중립입니다.
//!
//! 이 모듈은 입력에 대한 순수 함수만 포함합니다. 같은 입력은 항상 같은
//! 시그널을 만들며, 필요한 지표가 NaN인 규칙은 발동하지 않습니다.

use chrono::{DateTime, Utc};
use signal_core::{
    Direction, IndicatorSnapshot, PatternBias, PatternStrength, PriceActionContext, Signal, Symbol,
    Timeframe, Trend,
};
use tracing::debug;

/// 추세 규칙이 요구하는 최소 ADX.
pub const ADX_TREND_THRESHOLD: f64 = 20.0;
/// RSI 과매도 경계.
pub const RSI_OVERSOLD: f64 = 30.0;
/// RSI 과매수 경계.
pub const RSI_OVERBOUGHT: f64 = 70.0;
/// 손절 거리 (ATR 배수).
pub const STOP_LOSS_ATR: f64 = 1.5;
/// 목표가 거리 (ATR 배수).
pub const TAKE_PROFIT_ATR: f64 = 3.0;

/// 방향 규칙의 입력.
struct RuleInput<'a> {
    indicators: &'a IndicatorSnapshot,
    price_action: &'a PriceActionContext,
}

/// 이름이 붙은 방향 규칙.
///
/// 규칙 순서가 곧 우선순위입니다. 중첩 조건문 대신 목록으로 유지하여
/// 순서를 감사하고 규칙별로 테스트할 수 있게 합니다.
struct DirectionRule {
    name: &'static str,
    apply: fn(&RuleInput<'_>) -> Option<Direction>,
}

const DIRECTION_RULES: &[DirectionRule] = &[
    DirectionRule {
        name: "trend-momentum",
        apply: trend_momentum_rule,
    },
    DirectionRule {
        name: "pattern-follow",
        apply: pattern_follow_rule,
    },
];

/// 규칙 1: 강한 추세 + 모멘텀 정렬.
///
/// ADX가 임계값을 넘고 DI/MACD가 같은 방향이며 RSI가 극단이 아닐 때
/// 추세를 따릅니다.
fn trend_momentum_rule(input: &RuleInput<'_>) -> Option<Direction> {
    let ind = input.indicators;
    let required = [
        ind.adx,
        ind.plus_di,
        ind.minus_di,
        ind.macd_line,
        ind.macd_signal,
        ind.rsi,
    ];
    if required.iter().any(|v| !v.is_finite()) {
        return None;
    }
    if ind.adx <= ADX_TREND_THRESHOLD {
        return None;
    }
    let rsi_in_band = ind.rsi > RSI_OVERSOLD && ind.rsi < RSI_OVERBOUGHT;
    if !rsi_in_band {
        return None;
    }

    if ind.plus_di > ind.minus_di && ind.macd_line > ind.macd_signal {
        return Some(Direction::Long);
    }
    if ind.minus_di > ind.plus_di && ind.macd_line < ind.macd_signal {
        return Some(Direction::Short);
    }
    None
}

/// 규칙 2: 패턴 추종.
///
/// 보통 이상 강도의 방향성 패턴이 있고 타임프레임 추세가 반대가 아니면
/// 패턴 편향을 따릅니다.
fn pattern_follow_rule(input: &RuleInput<'_>) -> Option<Direction> {
    let pattern = input.price_action.pattern.as_ref()?;
    if pattern.strength < PatternStrength::Moderate {
        return None;
    }

    let trend = input.price_action.timeframe_trend;
    match pattern.bias {
        PatternBias::Bullish if trend != Trend::Down => Some(Direction::Long),
        PatternBias::Bearish if trend != Trend::Up => Some(Direction::Short),
        _ => None,
    }
}

/// 방향을 추론합니다. 어떤 규칙도 매칭되지 않으면 중립입니다.
pub fn infer_direction(
    indicators: &IndicatorSnapshot,
    price_action: &PriceActionContext,
) -> Direction {
    let input = RuleInput {
        indicators,
        price_action,
    };
    for rule in DIRECTION_RULES {
        if let Some(direction) = (rule.apply)(&input) {
            debug!(rule = rule.name, ?direction, "Direction rule matched");
            return direction;
        }
    }
    Direction::Neutral
}

/// ATR 배수로 손절/목표 레벨을 계산합니다.
///
/// 중립이거나 ATR이 유효하지 않으면 레벨이 없습니다.
fn trade_levels(direction: Direction, entry: f64, atr: f64) -> (Option<f64>, Option<f64>) {
    if !atr.is_finite() || atr <= 0.0 {
        return (None, None);
    }
    match direction {
        Direction::Long => (
            Some(entry - atr * STOP_LOSS_ATR),
            Some(entry + atr * TAKE_PROFIT_ATR),
        ),
        Direction::Short => (
            Some(entry + atr * STOP_LOSS_ATR),
            Some(entry - atr * TAKE_PROFIT_ATR),
        ),
        Direction::Neutral => (None, None),
    }
}

/// 지표 정합성 기반 신뢰도 점수 (0~100).
///
/// 추세 정렬 30점, 모멘텀 25점, RSI 구간 20점, 추세 강도 25점.
/// 중립 시그널은 0점입니다.
fn confidence(indicators: &IndicatorSnapshot, direction: Direction) -> f64 {
    let mut score = 0.0;
    let ind = indicators;

    match direction {
        Direction::Long => {
            if ind.ema20 > ind.ema50 {
                score += 15.0;
                if ind.close > ind.ema20 {
                    score += 15.0;
                }
            }
            if ind.macd_hist > 0.0 {
                score += 15.0;
            }
            if ind.plus_di > ind.minus_di {
                score += 10.0;
            }
            if (45.0..=70.0).contains(&ind.rsi) {
                score += 20.0;
            } else if (40.0..45.0).contains(&ind.rsi) || (70.0..=75.0).contains(&ind.rsi) {
                score += 10.0;
            }
            score += adx_score(ind.adx);
        }
        Direction::Short => {
            if ind.ema20 < ind.ema50 {
                score += 15.0;
                if ind.close < ind.ema20 {
                    score += 15.0;
                }
            }
            if ind.macd_hist < 0.0 {
                score += 15.0;
            }
            if ind.minus_di > ind.plus_di {
                score += 10.0;
            }
            if (30.0..=55.0).contains(&ind.rsi) {
                score += 20.0;
            } else if (25.0..30.0).contains(&ind.rsi) || (55.0..=60.0).contains(&ind.rsi) {
                score += 10.0;
            }
            score += adx_score(ind.adx);
        }
        Direction::Neutral => return 0.0,
    }

    score.clamp(0.0, 100.0)
}

fn adx_score(adx: f64) -> f64 {
    if adx >= 25.0 {
        25.0
    } else if adx >= 20.0 {
        15.0
    } else if adx >= 15.0 {
        10.0
    } else {
        0.0
    }
}

/// 시그널을 합성합니다 (`formatted` 필드는 비어 있음).
///
/// 진입가는 최근 종가이며 레벨은 ATR 배수로 계산됩니다. 이 함수는
/// 유효한 입력에 대해 절대 실패하지 않습니다.
pub fn synthesize(
    symbol: Symbol,
    timeframe: Timeframe,
    indicators: &IndicatorSnapshot,
    price_action: PriceActionContext,
    price_history: Vec<f64>,
    generated_at: DateTime<Utc>,
) -> Signal {
    let direction = infer_direction(indicators, &price_action);
    let entry = indicators.close;
    let (stop_loss, take_profit) = trade_levels(direction, entry, indicators.atr);
    let confidence = confidence(indicators, direction);

    Signal {
        symbol,
        timeframe,
        direction,
        entry,
        stop_loss,
        take_profit,
        confidence,
        indicators: *indicators,
        price_action,
        price_history,
        generated_at,
        formatted: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_core::CandlePattern;

    fn aligned_long_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema20: 102.0,
            ema50: 100.0,
            adx: 28.0,
            plus_di: 30.0,
            minus_di: 12.0,
            macd_line: 0.9,
            macd_signal: 0.4,
            macd_hist: 0.5,
            rsi: 58.0,
            atr: 2.0,
            close: 103.0,
        }
    }

    fn neutral_context() -> PriceActionContext {
        PriceActionContext {
            pattern: None,
            support: None,
            resistance: None,
            volume_ratio: 1.0,
            timeframe_trend: Trend::Sideways,
            higher_timeframe_trend: Trend::Unknown,
            summary: String::new(),
        }
    }

    fn mirror(snapshot: &IndicatorSnapshot) -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema20: 98.0,
            ema50: 100.0,
            plus_di: snapshot.minus_di,
            minus_di: snapshot.plus_di,
            macd_line: -snapshot.macd_line,
            macd_signal: -snapshot.macd_signal,
            macd_hist: -snapshot.macd_hist,
            rsi: 100.0 - snapshot.rsi,
            close: 97.0,
            ..*snapshot
        }
    }

    #[test]
    fn test_trend_momentum_long_and_short() {
        let long = aligned_long_snapshot();
        assert_eq!(infer_direction(&long, &neutral_context()), Direction::Long);

        let short = mirror(&long);
        assert_eq!(infer_direction(&short, &neutral_context()), Direction::Short);
    }

    #[test]
    fn test_weak_adx_falls_through_to_neutral() {
        let mut ind = aligned_long_snapshot();
        ind.adx = 12.0;
        assert_eq!(infer_direction(&ind, &neutral_context()), Direction::Neutral);
    }

    #[test]
    fn test_extreme_rsi_blocks_trend_rule() {
        let mut ind = aligned_long_snapshot();
        ind.rsi = 85.0;
        assert_eq!(infer_direction(&ind, &neutral_context()), Direction::Neutral);
    }

    #[test]
    fn test_nan_indicators_default_to_neutral() {
        let mut ind = aligned_long_snapshot();
        ind.adx = f64::NAN;
        assert_eq!(infer_direction(&ind, &neutral_context()), Direction::Neutral);
    }

    #[test]
    fn test_pattern_follow_respects_trend() {
        let mut ind = aligned_long_snapshot();
        ind.adx = 15.0; // 규칙 1 차단

        let mut context = neutral_context();
        context.pattern = Some(CandlePattern {
            name: "Bullish Engulfing".to_string(),
            bias: PatternBias::Bullish,
            strength: PatternStrength::Moderate,
            candle_count: 2,
        });
        assert_eq!(infer_direction(&ind, &context), Direction::Long);

        // 반대 추세에서는 패턴을 따르지 않음
        context.timeframe_trend = Trend::Down;
        assert_eq!(infer_direction(&ind, &context), Direction::Neutral);
    }

    #[test]
    fn test_weak_pattern_never_drives_direction() {
        let mut ind = aligned_long_snapshot();
        ind.adx = 15.0;

        let mut context = neutral_context();
        context.pattern = Some(CandlePattern {
            name: "Doji".to_string(),
            bias: PatternBias::Neutral,
            strength: PatternStrength::Weak,
            candle_count: 1,
        });
        assert_eq!(infer_direction(&ind, &context), Direction::Neutral);
    }

    #[test]
    fn test_long_levels_ordering() {
        let ind = aligned_long_snapshot();
        let signal = synthesize(
            Symbol::perp("BTC").unwrap(),
            Timeframe::H1,
            &ind,
            neutral_context(),
            vec![],
            Utc::now(),
        );

        assert_eq!(signal.direction, Direction::Long);
        assert_eq!(signal.entry, 103.0);
        let stop = signal.stop_loss.unwrap();
        let target = signal.take_profit.unwrap();
        assert!(stop < signal.entry && signal.entry < target);
        assert_eq!(stop, 103.0 - 3.0);
        assert_eq!(target, 103.0 + 6.0);
    }

    #[test]
    fn test_short_levels_ordering() {
        let ind = mirror(&aligned_long_snapshot());
        let signal = synthesize(
            Symbol::perp("BTC").unwrap(),
            Timeframe::H1,
            &ind,
            neutral_context(),
            vec![],
            Utc::now(),
        );

        assert_eq!(signal.direction, Direction::Short);
        let stop = signal.stop_loss.unwrap();
        let target = signal.take_profit.unwrap();
        assert!(target < signal.entry && signal.entry < stop);
    }

    #[test]
    fn test_neutral_has_no_levels_and_zero_confidence() {
        let mut ind = aligned_long_snapshot();
        ind.adx = 10.0;
        let signal = synthesize(
            Symbol::perp("BTC").unwrap(),
            Timeframe::H1,
            &ind,
            neutral_context(),
            vec![],
            Utc::now(),
        );

        assert_eq!(signal.direction, Direction::Neutral);
        assert!(signal.stop_loss.is_none());
        assert!(signal.take_profit.is_none());
        assert_eq!(signal.confidence, 0.0);
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let ind = aligned_long_snapshot();
        let at = Utc::now();
        let a = synthesize(
            Symbol::perp("BTC").unwrap(),
            Timeframe::H1,
            &ind,
            neutral_context(),
            vec![100.0, 101.0],
            at,
        );
        let b = synthesize(
            Symbol::perp("BTC").unwrap(),
            Timeframe::H1,
            &ind,
            neutral_context(),
            vec![100.0, 101.0],
            at,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_confidence_rewards_alignment() {
        let ind = aligned_long_snapshot();
        let strong = confidence(&ind, Direction::Long);
        // 완전 정렬: 30 + 15 + 10 + 20 + 25
        assert_eq!(strong, 100.0);

        let mut weak = ind;
        weak.adx = 10.0;
        weak.macd_hist = -0.1;
        assert!(confidence(&weak, Direction::Long) < strong);
    }
}
