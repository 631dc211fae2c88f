//! 캔들스틱 데이터를 위한 타임프레임 정의.
//!
//! 이 모듈은 시그널 파이프라인이 지원하는 고정된 타임프레임 집합을 정의합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 캔들스틱 타임프레임.
///
/// Hyperliquid 간격 문자열(`15m`, `1h`, `4h`, `1d`)과 일대일로 대응합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    /// 15분봉
    #[serde(rename = "15m")]
    M15,
    /// 1시간봉
    #[serde(rename = "1h")]
    H1,
    /// 4시간봉
    #[serde(rename = "4h")]
    H4,
    /// 일봉
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// 지원하는 모든 타임프레임 (짧은 것부터).
    pub const ALL: [Timeframe; 4] = [Timeframe::M15, Timeframe::H1, Timeframe::H4, Timeframe::D1];

    /// 이 타임프레임의 기간을 반환합니다.
    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::M15 => Duration::from_secs(15 * 60),
            Timeframe::H1 => Duration::from_secs(60 * 60),
            Timeframe::H4 => Duration::from_secs(4 * 60 * 60),
            Timeframe::D1 => Duration::from_secs(24 * 60 * 60),
        }
    }

    /// 이 타임프레임의 초 단위 값을 반환합니다.
    pub fn as_secs(&self) -> u64 {
        self.duration().as_secs()
    }

    /// 이 타임프레임의 분 단위 값을 반환합니다.
    pub fn as_minutes(&self) -> u64 {
        self.as_secs() / 60
    }

    /// 상위 타임프레임 편향 계산에 사용할 타임프레임을 반환합니다.
    ///
    /// 일봉은 상위 타임프레임이 없으므로 `None`을 반환합니다.
    pub fn higher(&self) -> Option<Timeframe> {
        match self {
            Timeframe::M15 => Some(Timeframe::H1),
            Timeframe::H1 => Some(Timeframe::H4),
            Timeframe::H4 => Some(Timeframe::D1),
            Timeframe::D1 => None,
        }
    }

    /// Hyperliquid 간격 문자열로 변환합니다.
    pub fn to_interval(&self) -> &'static str {
        match self {
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    /// Hyperliquid 간격 문자열에서 파싱합니다.
    pub fn from_interval(s: &str) -> Option<Self> {
        match s {
            "15m" => Some(Timeframe::M15),
            "1h" => Some(Timeframe::H1),
            "4h" => Some(Timeframe::H4),
            "1d" => Some(Timeframe::D1),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_interval())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_interval(s).ok_or_else(|| format!("Invalid timeframe: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_duration() {
        assert_eq!(Timeframe::M15.as_secs(), 900);
        assert_eq!(Timeframe::H1.as_secs(), 3600);
        assert_eq!(Timeframe::D1.as_minutes(), 1440);
    }

    #[test]
    fn test_timeframe_interval() {
        assert_eq!(Timeframe::H4.to_interval(), "4h");
        assert_eq!(Timeframe::from_interval("15m"), Some(Timeframe::M15));
        assert_eq!(Timeframe::from_interval("3m"), None);
    }

    #[test]
    fn test_timeframe_higher() {
        assert_eq!(Timeframe::M15.higher(), Some(Timeframe::H1));
        assert_eq!(Timeframe::H4.higher(), Some(Timeframe::D1));
        assert_eq!(Timeframe::D1.higher(), None);
    }

    #[test]
    fn test_timeframe_serde_uses_interval() {
        let json = serde_json::to_string(&Timeframe::M15).unwrap();
        assert_eq!(json, "\"15m\"");
        let tf: Timeframe = serde_json::from_str("\"1d\"").unwrap();
        assert_eq!(tf, Timeframe::D1);
    }
}
