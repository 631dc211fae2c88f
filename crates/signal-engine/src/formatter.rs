//! 시그널 텍스트 렌더링.
//!
//! 합성된 시그널을 고정 구조의 사람이 읽을 수 있는 텍스트 블록으로
//! 렌더링합니다. 같은 시그널은 항상 같은 텍스트를 만들며, 출력에는
//! 개행 외의 제어 문자가 포함되지 않습니다.

use signal_core::{Direction, IndicatorSnapshot, Signal};

/// 방향 배지.
fn direction_badge(direction: Direction) -> &'static str {
    match direction {
        Direction::Long => "\u{1F7E2}",    // 🟢
        Direction::Short => "\u{1F534}",   // 🔴
        Direction::Neutral => "\u{26AA}",  // ⚪
    }
}

/// 가격을 크기에 따라 포맷합니다.
///
/// - 1000 이상: 천 단위 구분자 + 소수점 2자리
/// - 1 이상: 소수점 4자리
/// - 1 미만: 소수점 6자리
pub fn format_price(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let abs = value.abs();
    if abs >= 1000.0 {
        with_thousands_separators(value)
    } else if abs >= 1.0 {
        format!("{:.4}", value)
    } else {
        format!("{:.6}", value)
    }
}

/// 소수점 2자리 + 천 단위 구분자.
fn with_thousands_separators(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (formatted, "00".to_string()),
    };

    let mut grouped = String::new();
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// 지표 값 요약 문장을 생성합니다.
fn analysis_summary(ind: &IndicatorSnapshot) -> String {
    let trend_direction = if ind.ema20 > ind.ema50 { "up" } else { "down" };
    let trend_cmp = if ind.ema20 > ind.ema50 { ">" } else { "<" };
    let di_cmp = if ind.plus_di > ind.minus_di { ">" } else { "<" };
    let momentum = if ind.macd_hist > 0.0 {
        "Momentum: MACD hist rising"
    } else {
        "Momentum: MACD hist falling"
    };

    [
        format!(
            "Trend {}: EMA20 {:.2} {} EMA50 {:.2}",
            trend_direction, ind.ema20, trend_cmp, ind.ema50
        ),
        format!(
            "ADX {:.1}, +DI {:.1} {} -DI {:.1}",
            ind.adx, ind.plus_di, di_cmp, ind.minus_di
        ),
        momentum.to_string(),
        format!("RSI {:.1}", ind.rsi),
        format!("ATR {:.3}", ind.atr),
    ]
    .join("; ")
}

/// 시그널을 고정 구조 텍스트 블록으로 렌더링합니다.
pub fn format_signal(signal: &Signal) -> String {
    let header = format!(
        "{} \u{26A1} \u{1F4C5} {} (PERP - {})",
        direction_badge(signal.direction),
        signal.symbol,
        signal.timeframe.to_interval().to_uppercase()
    );

    let mut lines = vec![
        header,
        String::new(),
        format!("{} Signal", signal.direction),
        format!("- Entry: {}", format_price(signal.entry)),
    ];

    if let Some(stop) = signal.stop_loss {
        lines.push(format!("- Stop Loss: {}", format_price(stop)));
    }
    if let Some(target) = signal.take_profit {
        lines.push(format!("- Take Profit: {}", format_price(target)));
    }

    lines.push(format!("- Confidence: {:.0}/100", signal.confidence));
    lines.push(String::new());
    lines.push(format!("Analysis: {}", analysis_summary(&signal.indicators)));

    if !signal.price_action.summary.is_empty() {
        lines.push(String::new());
        lines.push(format!("Price Action: {}", signal.price_action.summary));
    }

    lines.push(String::new());
    lines.push(format!(
        "Signal generated at {} UTC",
        signal.generated_at.format("%H:%M")
    ));

    lines.join("\n")
}
