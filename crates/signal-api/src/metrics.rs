//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭을 수집하고 `/metrics` 엔드포인트로 노출합니다.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// # 패닉
/// 레코더가 이미 설치되어 있으면 패닉합니다.
pub fn setup_metrics_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        // HTTP 요청 지속 시간 히스토그램 버킷 설정
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .expect("히스토그램 버킷 설정 실패")
        .install_recorder()
        .expect("Prometheus 레코더 설치 실패")
}

/// HTTP 요청 카운터 증가.
pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

/// 생성된 시그널 카운터 증가.
pub fn record_signal(symbol: &str, timeframe: &str, direction: &str) {
    counter!(
        "signals_generated_total",
        "symbol" => symbol.to_string(),
        "timeframe" => timeframe.to_string(),
        "direction" => direction.to_string()
    )
    .increment(1);
}

/// 메트릭 라벨 카디널리티를 제한하기 위해 경로 파라미터를 정규화합니다.
///
/// `/signals/BTC` → `/signals/:symbol`
pub fn normalize_path(path: &str) -> String {
    let mut segments = path.split('/');
    // 선행 빈 세그먼트
    segments.next();

    match (segments.next(), segments.next()) {
        (Some("signals"), Some(_)) => "/signals/:symbol".to_string(),
        _ => path.to_string(),
    }
}
