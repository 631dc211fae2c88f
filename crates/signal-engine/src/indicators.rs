//! 기술 지표 계산.
//!
//! 모든 지표는 입력 시리즈와 같은 길이의 f64 컬럼으로 계산되며,
//! 웜업이 끝나지 않은 인덱스는 NaN입니다. 각 값은 자신보다 앞선
//! 인덱스에만 의존합니다 (lookahead 없음). 순차 스무딩은 누적 변수를
//! 갱신하는 fold로 표현됩니다.

use signal_core::{CandleSeries, IndicatorSnapshot, SignalError, SignalResult};

/// 지표 계산에 필요한 최소 캔들 수.
///
/// EMA50 시드(50)가 ADX 웜업(28)보다 길어 기준이 됩니다.
pub const MIN_CANDLES: usize = 50;

/// EMA 기간 (단기).
pub const EMA_FAST_PERIOD: usize = 20;
/// EMA 기간 (장기).
pub const EMA_SLOW_PERIOD: usize = 50;
/// RSI / ATR / DMI 공통 기간.
pub const WILDER_PERIOD: usize = 14;
/// MACD 단기 EMA 기간.
pub const MACD_FAST: usize = 12;
/// MACD 장기 EMA 기간.
pub const MACD_SLOW: usize = 26;
/// MACD 시그널 EMA 기간.
pub const MACD_SIGNAL: usize = 9;

/// 캔들 시리즈 전체에 대한 지표 스냅샷을 계산합니다.
///
/// 반환 시퀀스는 입력과 같은 길이이며 인덱스가 캔들과 일치합니다.
///
/// # Errors
/// 시리즈 길이가 [`MIN_CANDLES`] 미만이면 `InsufficientData`를 반환합니다.
pub fn compute_indicators(series: &CandleSeries) -> SignalResult<Vec<IndicatorSnapshot>> {
    let len = series.len();
    if len < MIN_CANDLES {
        return Err(SignalError::InsufficientData {
            required: MIN_CANDLES,
            actual: len,
        });
    }

    let closes = series.closes();
    let highs = series.highs();
    let lows = series.lows();

    let ema20 = ema(&closes, EMA_FAST_PERIOD);
    let ema50 = ema(&closes, EMA_SLOW_PERIOD);
    let rsi = rsi(&closes, WILDER_PERIOD);
    let atr = atr(&highs, &lows, &closes, WILDER_PERIOD);
    let (plus_di, minus_di, adx) = dmi(&highs, &lows, &closes, WILDER_PERIOD);
    let (macd_line, macd_signal, macd_hist) = macd(&closes);

    Ok((0..len)
        .map(|i| IndicatorSnapshot {
            ema20: ema20[i],
            ema50: ema50[i],
            adx: adx[i],
            plus_di: plus_di[i],
            minus_di: minus_di[i],
            macd_line: macd_line[i],
            macd_signal: macd_signal[i],
            macd_hist: macd_hist[i],
            rsi: rsi[i],
            atr: atr[i],
            close: closes[i],
        })
        .collect())
}

/// EMA 컬럼을 계산합니다.
///
/// 첫 `period`개 유효 값의 SMA로 시드하며, 그 이전 인덱스는 NaN입니다.
/// 입력의 NaN 프리픽스(예: MACD 선)는 건너뜁니다.
pub(crate) fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let Some(first) = values.iter().position(|v| !v.is_nan()) else {
        return out;
    };
    if period == 0 || values.len() - first < period {
        return out;
    }

    let seed_idx = first + period - 1;
    let seed = values[first..=seed_idx].iter().sum::<f64>() / period as f64;
    let alpha = 2.0 / (period as f64 + 1.0);

    out[seed_idx] = seed;
    let mut prev = seed;
    for i in (seed_idx + 1)..values.len() {
        prev = (values[i] - prev) * alpha + prev;
        out[i] = prev;
    }
    out
}

/// Wilder 방식 RSI 컬럼을 계산합니다.
///
/// 평균 손실이 정확히 0이면 100입니다. 첫 값은 인덱스 `period`에서 나옵니다.
fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let len = closes.len();
    let mut out = vec![f64::NAN; len];
    if len < period + 1 {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss += -change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = rsi_value(avg_gain, avg_loss);

    for i in (period + 1)..len {
        let change = closes[i] - closes[i - 1];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// True Range를 계산합니다 (인덱스 1부터 정의).
fn true_range(highs: &[f64], lows: &[f64], closes: &[f64], i: usize) -> f64 {
    let hl = highs[i] - lows[i];
    let hc = (highs[i] - closes[i - 1]).abs();
    let lc = (lows[i] - closes[i - 1]).abs();
    hl.max(hc).max(lc)
}

/// Wilder 방식 ATR 컬럼을 계산합니다.
///
/// 첫 값은 인덱스 `period`에서 첫 `period`개 TR의 단순 평균으로 시드됩니다.
fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let len = closes.len();
    let mut out = vec![f64::NAN; len];
    if len < period + 1 {
        return out;
    }

    let mut sum = 0.0;
    for i in 1..=period {
        sum += true_range(highs, lows, closes, i);
    }
    let mut current = sum / period as f64;
    out[period] = current;

    for i in (period + 1)..len {
        let tr = true_range(highs, lows, closes, i);
        current = (current * (period as f64 - 1.0) + tr) / period as f64;
        out[i] = current;
    }
    out
}

/// +DI / -DI / ADX 컬럼을 계산합니다.
///
/// DM과 TR에 Wilder 스무딩을 적용해 인덱스 `period`부터 DI가 나오고,
/// DX를 다시 `period`개 평균·스무딩하여 인덱스 `2*period - 1`부터 ADX가
/// 나옵니다.
fn dmi(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let len = closes.len();
    let mut plus_di = vec![f64::NAN; len];
    let mut minus_di = vec![f64::NAN; len];
    let mut adx = vec![f64::NAN; len];
    if len < period + 1 {
        return (plus_di, minus_di, adx);
    }

    let dm = |i: usize| -> (f64, f64) {
        let up = highs[i] - highs[i - 1];
        let down = lows[i - 1] - lows[i];
        let plus = if up > down && up > 0.0 { up } else { 0.0 };
        let minus = if down > up && down > 0.0 { down } else { 0.0 };
        (plus, minus)
    };

    // 첫 period개 합으로 시드
    let mut smoothed_tr = 0.0;
    let mut smoothed_plus = 0.0;
    let mut smoothed_minus = 0.0;
    for i in 1..=period {
        let (p, m) = dm(i);
        smoothed_tr += true_range(highs, lows, closes, i);
        smoothed_plus += p;
        smoothed_minus += m;
    }

    let mut dx = vec![f64::NAN; len];
    let write_di = |idx: usize,
                        tr: f64,
                        plus: f64,
                        minus: f64,
                        plus_di: &mut Vec<f64>,
                        minus_di: &mut Vec<f64>,
                        dx: &mut Vec<f64>| {
        let (pdi, mdi) = if tr > 0.0 {
            (100.0 * plus / tr, 100.0 * minus / tr)
        } else {
            (0.0, 0.0)
        };
        plus_di[idx] = pdi;
        minus_di[idx] = mdi;
        let di_sum = pdi + mdi;
        dx[idx] = if di_sum > 0.0 {
            100.0 * (pdi - mdi).abs() / di_sum
        } else {
            0.0
        };
    };

    write_di(
        period,
        smoothed_tr,
        smoothed_plus,
        smoothed_minus,
        &mut plus_di,
        &mut minus_di,
        &mut dx,
    );

    for i in (period + 1)..len {
        let (p, m) = dm(i);
        let tr = true_range(highs, lows, closes, i);
        smoothed_tr = smoothed_tr - smoothed_tr / period as f64 + tr;
        smoothed_plus = smoothed_plus - smoothed_plus / period as f64 + p;
        smoothed_minus = smoothed_minus - smoothed_minus / period as f64 + m;
        write_di(
            i,
            smoothed_tr,
            smoothed_plus,
            smoothed_minus,
            &mut plus_di,
            &mut minus_di,
            &mut dx,
        );
    }

    // ADX: 첫 period개 DX의 평균으로 시드 후 Wilder 스무딩
    let adx_start = 2 * period - 1;
    if len > adx_start {
        let mut sum = 0.0;
        for value in dx.iter().take(adx_start + 1).skip(period) {
            sum += *value;
        }
        let mut current = sum / period as f64;
        adx[adx_start] = current;

        for i in (adx_start + 1)..len {
            current = (current * (period as f64 - 1.0) + dx[i]) / period as f64;
            adx[i] = current;
        }
    }

    (plus_di, minus_di, adx)
}

/// MACD 선/시그널/히스토그램 컬럼을 계산합니다.
fn macd(closes: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let len = closes.len();
    let fast = ema(closes, MACD_FAST);
    let slow = ema(closes, MACD_SLOW);

    let line: Vec<f64> = (0..len).map(|i| fast[i] - slow[i]).collect();
    let signal = ema(&line, MACD_SIGNAL);
    let hist: Vec<f64> = (0..len).map(|i| line[i] - signal[i]).collect();

    (line, signal, hist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use signal_core::{Candle, Symbol, Timeframe};

    fn series_from_ohlc(rows: &[(f64, f64, f64, f64)]) -> CandleSeries {
        let candles = rows
            .iter()
            .enumerate()
            .map(|(i, (open, high, low, close))| Candle {
                open_time: DateTime::from_timestamp(i as i64 * 3600, 0).unwrap(),
                open: Decimal::try_from(*open).unwrap(),
                high: Decimal::try_from(*high).unwrap(),
                low: Decimal::try_from(*low).unwrap(),
                close: Decimal::try_from(*close).unwrap(),
                volume: Decimal::from(1000),
                close_time: DateTime::from_timestamp(i as i64 * 3600 + 3600, 0).unwrap(),
            })
            .collect();
        CandleSeries::from_candles(Symbol::perp("BTC").unwrap(), Timeframe::H1, candles)
    }

    fn series_from_closes(closes: &[f64]) -> CandleSeries {
        let rows: Vec<(f64, f64, f64, f64)> = closes
            .iter()
            .map(|&c| (c - 0.5, c + 1.0, c - 1.0, c))
            .collect();
        series_from_ohlc(&rows)
    }

    #[test]
    fn test_insufficient_data() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let err = compute_indicators(&series_from_closes(&closes)).unwrap_err();
        assert!(matches!(
            err,
            SignalError::InsufficientData {
                required: MIN_CANDLES,
                actual: 10
            }
        ));
    }

    #[test]
    fn test_snapshot_alignment_and_warmup() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64).sin()).collect();
        let snapshots = compute_indicators(&series_from_closes(&closes)).unwrap();
        assert_eq!(snapshots.len(), 60);

        // 웜업 경계: 경계 직전은 NaN, 경계부터는 유한
        assert!(snapshots[18].ema20.is_nan());
        assert!(snapshots[19].ema20.is_finite());
        assert!(snapshots[48].ema50.is_nan());
        assert!(snapshots[49].ema50.is_finite());
        assert!(snapshots[13].rsi.is_nan());
        assert!(snapshots[14].rsi.is_finite());
        assert!(snapshots[13].atr.is_nan());
        assert!(snapshots[14].atr.is_finite());
        assert!(snapshots[13].plus_di.is_nan());
        assert!(snapshots[14].plus_di.is_finite());
        assert!(snapshots[26].adx.is_nan());
        assert!(snapshots[27].adx.is_finite());
        assert!(snapshots[24].macd_line.is_nan());
        assert!(snapshots[25].macd_line.is_finite());
        assert!(snapshots[32].macd_signal.is_nan());
        assert!(snapshots[33].macd_signal.is_finite());

        // 가장 긴 웜업 이후에는 NaN이 없어야 함
        for (i, snapshot) in snapshots.iter().enumerate().skip(49) {
            assert!(snapshot.ema20.is_finite(), "ema20 NaN at {}", i);
            assert!(snapshot.ema50.is_finite(), "ema50 NaN at {}", i);
            assert!(snapshot.adx.is_finite(), "adx NaN at {}", i);
            assert!(snapshot.rsi.is_finite(), "rsi NaN at {}", i);
            assert!(snapshot.atr.is_finite(), "atr NaN at {}", i);
            assert!(snapshot.macd_hist.is_finite(), "macd_hist NaN at {}", i);
        }
    }

    #[test]
    fn test_ema_converges_on_constant_series() {
        let closes = vec![42.5; 80];
        let snapshots = compute_indicators(&series_from_closes(&closes)).unwrap();
        let last = snapshots.last().unwrap();
        assert!((last.ema20 - 42.5).abs() < 1e-9);
        assert!((last.ema50 - 42.5).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_is_100_for_strictly_rising_closes() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let snapshots = compute_indicators(&series_from_closes(&closes)).unwrap();
        let last = snapshots.last().unwrap();
        assert_eq!(last.rsi, 100.0);
        assert!(last.plus_di > last.minus_di);
    }

    #[test]
    fn test_atr_reflects_range() {
        // 고가-저가 2.0 고정, 갭 없음 -> ATR은 2.0으로 수렴
        let rows: Vec<(f64, f64, f64, f64)> =
            (0..60).map(|_| (100.0, 101.0, 99.0, 100.0)).collect();
        let snapshots = compute_indicators(&series_from_ohlc(&rows)).unwrap();
        let last = snapshots.last().unwrap();
        assert!((last.atr - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_macd_sign_matches_trend() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let snapshots = compute_indicators(&series_from_closes(&closes)).unwrap();
        let last = snapshots.last().unwrap();
        // 지속 상승에서는 단기 EMA가 장기 EMA 위 -> MACD 선 양수
        assert!(last.macd_line > 0.0);
        assert!(last.ema20 > last.ema50);
    }

    #[test]
    fn test_no_lookahead() {
        // 앞쪽 60개가 같으면 뒤쪽 데이터와 무관하게 앞쪽 지표도 같아야 함
        let base: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).cos() * 3.0).collect();
        let mut extended = base.clone();
        extended.extend((0..20).map(|i| 500.0 + i as f64));

        let short = compute_indicators(&series_from_closes(&base)).unwrap();
        let long = compute_indicators(&series_from_closes(&extended)).unwrap();

        for i in 0..60 {
            let a = short[i];
            let b = long[i];
            let eq = |x: f64, y: f64| (x.is_nan() && y.is_nan()) || (x - y).abs() < 1e-9;
            assert!(eq(a.ema20, b.ema20), "ema20 differs at {}", i);
            assert!(eq(a.rsi, b.rsi), "rsi differs at {}", i);
            assert!(eq(a.adx, b.adx), "adx differs at {}", i);
            assert!(eq(a.macd_hist, b.macd_hist), "macd_hist differs at {}", i);
        }
    }

    proptest! {
        #[test]
        fn prop_rsi_bounded_and_atr_non_negative(
            closes in proptest::collection::vec(1.0f64..10_000.0, 50..120)
        ) {
            let snapshots = compute_indicators(&series_from_closes(&closes)).unwrap();
            for snapshot in &snapshots {
                if snapshot.rsi.is_finite() {
                    prop_assert!((0.0..=100.0).contains(&snapshot.rsi));
                }
                if snapshot.atr.is_finite() {
                    prop_assert!(snapshot.atr >= 0.0);
                }
            }
        }
    }
}
