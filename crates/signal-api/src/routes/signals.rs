//! 시그널 API 라우트.
//!
//! (심볼, 타임프레임)별 트레이딩 시그널을 조회합니다.
//!
//! # 엔드포인트
//!
//! - `GET /signals?symbols=...&timeframes=...` - 다중 심볼 시그널
//! - `GET /signals/{symbol}?timeframes=...` - 단일 심볼 시그널
//!
//! `symbols`/`timeframes`는 반복 파라미터와 쉼표 구분 목록을 모두
//! 지원합니다. 검증은 업스트림 조회 전에 수행되며, 파이프라인 실패는
//! 요청 전체를 중단하지 않고 행 단위로 보고됩니다.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;

use signal_core::{SignalFailure, SignalOutcome, Symbol, Timeframe};

use crate::error::ApiError;
use crate::metrics::record_signal;
use crate::state::AppState;

// ==================== 응답 타입 ====================

/// 다중 심볼 시그널 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct SignalsResponse {
    /// 심볼별 시그널/실패 행 (요청 타임프레임 순서)
    #[schema(value_type = Object)]
    pub symbols: BTreeMap<String, Vec<SignalOutcome>>,
    /// 평가된 타임프레임
    pub timeframes: Vec<String>,
}

/// 단일 심볼 시그널 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct SymbolSignalsResponse {
    /// 심볼
    pub symbol: String,
    /// 평가된 타임프레임
    pub timeframes: Vec<String>,
    /// 시그널/실패 행 (요청 타임프레임 순서)
    #[schema(value_type = Vec<Object>)]
    pub signals: Vec<SignalOutcome>,
}

// ==================== 쿼리 파싱 ====================

/// 반복 및 쉼표 구분 값을 모두 수집합니다.
fn collect_values(params: &[(String, String)], key: &str) -> Vec<String> {
    params
        .iter()
        .filter(|(k, _)| k == key)
        .flat_map(|(_, v)| v.split(','))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn has_key(params: &[(String, String)], key: &str) -> bool {
    params.iter().any(|(k, _)| k == key)
}

/// 타임프레임 파라미터를 검증하고 해석합니다.
///
/// 파라미터가 아예 없으면 기본 목록을 사용합니다. 지원하지 않는 값이
/// 하나라도 있으면 조회 전에 `InvalidRequest`로 실패합니다.
fn resolve_timeframes(
    params: &[(String, String)],
    defaults: &[Timeframe],
) -> Result<Vec<Timeframe>, ApiError> {
    let raw = collect_values(params, "timeframes");
    if raw.is_empty() {
        if has_key(params, "timeframes") {
            return Err(signal_core::SignalError::InvalidRequest(
                "타임프레임이 비어 있습니다".to_string(),
            )
            .into());
        }
        return Ok(defaults.to_vec());
    }

    let invalid: Vec<&str> = raw
        .iter()
        .filter(|s| s.parse::<Timeframe>().is_err())
        .map(|s| s.as_str())
        .collect();
    if !invalid.is_empty() {
        return Err(signal_core::SignalError::InvalidRequest(format!(
            "Unsupported timeframes: {}",
            invalid.join(", ")
        ))
        .into());
    }

    Ok(raw.iter().filter_map(|s| s.parse().ok()).collect())
}

/// 심볼 파라미터를 검증하고 해석합니다.
fn resolve_symbols(
    params: &[(String, String)],
    defaults: &[Symbol],
) -> Result<Vec<Symbol>, ApiError> {
    let raw = collect_values(params, "symbols");
    if raw.is_empty() {
        if has_key(params, "symbols") {
            return Err(signal_core::SignalError::InvalidRequest(
                "최소 한 개의 심볼이 필요합니다".to_string(),
            )
            .into());
        }
        return Ok(defaults.to_vec());
    }

    raw.iter()
        .map(|s| Symbol::perp(s).map_err(ApiError::from))
        .collect()
}

fn timeframe_strings(timeframes: &[Timeframe]) -> Vec<String> {
    timeframes.iter().map(|tf| tf.to_string()).collect()
}

fn record_outcome_metrics(rows: &[SignalOutcome]) {
    for row in rows {
        if let Some(signal) = row.signal() {
            record_signal(
                signal.symbol.as_str(),
                signal.timeframe.to_interval(),
                &signal.direction.to_string(),
            );
        }
    }
}

// ==================== 핸들러 ====================

/// 다중 심볼 시그널 조회.
///
/// GET /signals?symbols=BTC&symbols=ETH&timeframes=1h,4h
#[utoipa::path(
    get,
    path = "/signals",
    tag = "signals",
    params(
        ("symbols" = Option<String>, Query, description = "심볼 (반복 또는 쉼표 구분, 기본: BTC)"),
        ("timeframes" = Option<String>, Query, description = "타임프레임 (반복 또는 쉼표 구분, 기본: 1d,4h,1h,15m)"),
    ),
    responses(
        (status = 200, description = "심볼별 시그널 (부분 실패는 행으로 표현)", body = SignalsResponse),
        (status = 400, description = "잘못된 심볼/타임프레임", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_signals_multi(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<SignalsResponse>, ApiError> {
    let timeframes = resolve_timeframes(&params, &state.default_timeframes)?;
    let symbols = resolve_symbols(&params, &state.default_symbols)?;

    let outcomes = state.generator.generate_batch(&symbols, &timeframes).await;
    for rows in outcomes.values() {
        record_outcome_metrics(rows);
    }

    Ok(Json(SignalsResponse {
        symbols: outcomes,
        timeframes: timeframe_strings(&timeframes),
    }))
}

/// 단일 심볼 시그널 조회.
///
/// GET /signals/{symbol}?timeframes=1h,4h
///
/// 모든 타임프레임이 실패하면 첫 실패의 상태 코드로 응답합니다
/// (예: 미지원 심볼 404). 일부만 실패하면 200과 함께 실패 행을 포함합니다.
#[utoipa::path(
    get,
    path = "/signals/{symbol}",
    tag = "signals",
    params(
        ("symbol" = String, Path, description = "퍼프 심볼 (예: BTC)"),
        ("timeframes" = Option<String>, Query, description = "타임프레임 (반복 또는 쉼표 구분)"),
    ),
    responses(
        (status = 200, description = "심볼 시그널", body = SymbolSignalsResponse),
        (status = 400, description = "잘못된 요청", body = crate::error::ErrorResponse),
        (status = 404, description = "알 수 없는 심볼", body = crate::error::ErrorResponse),
        (status = 422, description = "캔들 데이터 부족", body = crate::error::ErrorResponse),
        (status = 502, description = "업스트림 데이터 소스 장애", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_symbol_signals(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<SymbolSignalsResponse>, ApiError> {
    let symbol = Symbol::perp(&symbol)?;
    let timeframes = resolve_timeframes(&params, &state.default_timeframes)?;

    let results = state.generator.generate_many(&symbol, &timeframes).await;

    // 모든 행이 실패하면 첫 실패를 상태 코드로 매핑
    if results.iter().all(|r| r.is_err()) {
        if let Some(error) = results.iter().find_map(|r| r.as_ref().err().cloned()) {
            return Err(error.into());
        }
    }

    let signals: Vec<SignalOutcome> = results
        .into_iter()
        .zip(timeframes.iter())
        .map(|(result, timeframe)| match result {
            Ok(signal) => SignalOutcome::Ok(Box::new(signal)),
            Err(error) => SignalOutcome::Err(SignalFailure {
                symbol: symbol.clone(),
                timeframe: *timeframe,
                error: error.to_string(),
            }),
        })
        .collect();
    record_outcome_metrics(&signals);

    Ok(Json(SymbolSignalsResponse {
        symbol: symbol.to_string(),
        timeframes: timeframe_strings(&timeframes),
        signals,
    }))
}

/// 시그널 라우터 생성.
pub fn signals_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signals", get(get_signals_multi))
        .route("/signals/{symbol}", get(get_symbol_signals))
}
