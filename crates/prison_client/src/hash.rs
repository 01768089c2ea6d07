//! Challenge token strategies.
//!
//! The server issues a seed during the handshake and expects a token derived
//! from it in the registration line. Two derivations have been observed and
//! neither is known to be canonical, so the derivation is a swappable
//! strategy selected by configuration.

use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Tokens are truncated to this many hex digits.
pub const TOKEN_LEN: usize = 10;

/// Derives the handshake token from a server seed.
pub trait TokenStrategy: fmt::Debug + Send + Sync {
    /// Name used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Token for this seed.
    fn token(&self, seed: &str) -> String;
}

/// 32-bit rolling checksum (`h = h * 31 + unit` over UTF-16 code units),
/// rendered as the hex of its absolute value.
#[derive(Debug, Clone, Copy, Default)]
pub struct RollingChecksum;

impl TokenStrategy for RollingChecksum {
    fn name(&self) -> &'static str {
        "rolling"
    }

    fn token(&self, seed: &str) -> String {
        let mut h: i32 = 0;
        for unit in seed.encode_utf16() {
            h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit));
        }
        // i32::MIN has no positive i32 counterpart
        let mut hex = format!("{:x}", i64::from(h).abs());
        hex.truncate(TOKEN_LEN);
        hex
    }
}

/// SHA-256 of the seed bytes, hex encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl TokenStrategy for Sha256Digest {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn token(&self, seed: &str) -> String {
        let digest = Sha256::digest(seed.as_bytes());
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{byte:02x}");
        }
        hex.truncate(TOKEN_LEN);
        hex
    }
}

/// Configurable strategy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenAlgorithm {
    /// [`RollingChecksum`].
    #[default]
    Rolling,
    /// [`Sha256Digest`].
    Sha256,
}

impl TokenAlgorithm {
    /// Boxed strategy for this algorithm.
    #[must_use]
    pub fn strategy(self) -> Box<dyn TokenStrategy> {
        match self {
            Self::Rolling => Box::new(RollingChecksum),
            Self::Sha256 => Box::new(Sha256Digest),
        }
    }

    /// Token for a seed under this algorithm.
    #[must_use]
    pub fn token(self, seed: &str) -> String {
        match self {
            Self::Rolling => RollingChecksum.token(seed),
            Self::Sha256 => Sha256Digest.token(seed),
        }
    }
}

impl fmt::Display for TokenAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rolling => f.write_str("rolling"),
            Self::Sha256 => f.write_str("sha256"),
        }
    }
}

impl FromStr for TokenAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rolling" => Ok(Self::Rolling),
            "sha256" => Ok(Self::Sha256),
            other => Err(format!(
                "unknown token algorithm '{other}' (expected rolling or sha256)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_known_values() {
        assert_eq!(RollingChecksum.token(""), "0");
        assert_eq!(RollingChecksum.token("a"), "61");
        assert_eq!(RollingChecksum.token("abc"), "17862");
    }

    #[test]
    fn test_rolling_wraps_and_takes_absolute_value() {
        // Long seeds overflow 32 bits many times over.
        let token = RollingChecksum.token("the quick brown fox jumps over the lazy dog");
        assert!(!token.is_empty());
        assert!(token.len() <= TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sha256_truncated() {
        assert_eq!(Sha256Digest.token("abc"), "ba7816bf8f");
        assert_eq!(Sha256Digest.token("").len(), TOKEN_LEN);
    }

    #[test]
    fn test_algorithm_parse_and_display() {
        assert_eq!("Rolling".parse::<TokenAlgorithm>(), Ok(TokenAlgorithm::Rolling));
        assert_eq!("sha256".parse::<TokenAlgorithm>(), Ok(TokenAlgorithm::Sha256));
        assert!("md5".parse::<TokenAlgorithm>().is_err());
        assert_eq!(TokenAlgorithm::Sha256.to_string(), "sha256");
        assert_eq!(TokenAlgorithm::Sha256.strategy().name(), "sha256");
    }
}
