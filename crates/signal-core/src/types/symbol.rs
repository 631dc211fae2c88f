//! 퍼페추얼 심볼 정의.
//!
//! Hyperliquid 퍼페추얼 마켓은 코인 이름(`BTC`, `ETH`)만으로 식별되며
//! 호가 자산은 항상 USD입니다.

use crate::error::SignalError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 퍼페추얼 마켓 심볼.
///
/// 비어 있지 않은 ASCII 영숫자 코인 이름을 대문자로 정규화하여 보관합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// 새 퍼프 심볼을 생성합니다.
    ///
    /// # Errors
    /// 코인 이름이 비어 있거나 ASCII 영숫자가 아니면 `InvalidRequest`를 반환합니다.
    pub fn perp(coin: impl AsRef<str>) -> Result<Self, SignalError> {
        let coin = coin.as_ref().trim();
        if coin.is_empty() {
            return Err(SignalError::InvalidRequest(
                "심볼이 비어 있습니다".to_string(),
            ));
        }
        if !coin.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SignalError::InvalidRequest(format!(
                "유효하지 않은 심볼: {}",
                coin
            )));
        }
        Ok(Self(coin.to_ascii_uppercase()))
    }

    /// 코인 이름을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::perp(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_uppercases() {
        let symbol = Symbol::perp("btc").unwrap();
        assert_eq!(symbol.as_str(), "BTC");
        assert_eq!(symbol.to_string(), "BTC");
    }

    #[test]
    fn test_symbol_rejects_empty() {
        assert!(Symbol::perp("").is_err());
        assert!(Symbol::perp("   ").is_err());
    }

    #[test]
    fn test_symbol_rejects_non_alphanumeric() {
        assert!(Symbol::perp("BTC/USDT").is_err());
        assert!(Symbol::perp("BTC USD").is_err());
    }

    #[test]
    fn test_symbol_serde_transparent() {
        let symbol = Symbol::perp("ETH").unwrap();
        assert_eq!(serde_json::to_string(&symbol).unwrap(), "\"ETH\"");
    }
}
