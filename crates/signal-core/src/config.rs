//! 설정 관리.
//!
//! 이 모듈은 시그널 서비스의 애플리케이션 설정을 정의하고 관리합니다.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Hyperliquid 데이터 소스 설정
    #[serde(default)]
    pub hyperliquid: HyperliquidSettings,
    /// 시그널 생성 설정
    #[serde(default)]
    pub signal: SignalSettings,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Hyperliquid 데이터 소스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HyperliquidSettings {
    /// REST API 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 일시적 네트워크 오류 시 1회 재시도 여부
    #[serde(default = "default_retry")]
    pub retry_transient: bool,
}

fn default_timeout_secs() -> u64 {
    10
}
fn default_retry() -> bool {
    true
}

impl Default for HyperliquidSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.hyperliquid.xyz".to_string(),
            timeout_secs: default_timeout_secs(),
            retry_transient: default_retry(),
        }
    }
}

/// 시그널 생성 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalSettings {
    /// 기본 심볼 목록
    pub default_symbols: Vec<String>,
    /// 기본 타임프레임 목록
    pub default_timeframes: Vec<String>,
    /// 요청당 캔들 수
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    /// 상위 타임프레임 편향 계산용 캔들 수
    #[serde(default = "default_higher_lookback")]
    pub higher_timeframe_lookback: usize,
}

fn default_lookback() -> usize {
    250
}
fn default_higher_lookback() -> usize {
    120
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            default_symbols: vec!["BTC".to_string()],
            default_timeframes: vec![
                "1d".to_string(),
                "4h".to_string(),
                "1h".to_string(),
                "15m".to_string(),
            ],
            lookback: default_lookback(),
            higher_timeframe_lookback: default_higher_lookback(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()))
            // 환경 변수로 오버라이드 (예: SIGNAL__SERVER__PORT=8080)
            .add_source(
                config::Environment::with_prefix("SIGNAL")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    ///
    /// 설정 파일이 없으면 기본값을 사용하고, 있는데 잘못되었으면 에러를
    /// 반환합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        let path = Path::new("config/default.toml");
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.hyperliquid.base_url, "https://api.hyperliquid.xyz");
        assert_eq!(config.signal.lookback, 250);
        assert_eq!(config.signal.default_symbols, vec!["BTC"]);
    }

    #[test]
    fn test_default_timeframes_are_supported() {
        use crate::types::Timeframe;

        let config = AppConfig::default();
        for tf in &config.signal.default_timeframes {
            assert!(tf.parse::<Timeframe>().is_ok(), "unsupported: {}", tf);
        }
    }
}
