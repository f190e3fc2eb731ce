//! Codec identifiers and `Accept-Encoding` negotiation.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PoolError;

/// Stream codecs served by the encoder pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Raw DEFLATE stream (RFC 1951), no framing
    Deflate,
    /// Gzip member (RFC 1952): header, DEFLATE body, CRC-32 + size trailer
    Gzip,
}

impl Codec {
    /// Value for the `Content-Encoding` header
    pub fn content_encoding(&self) -> &'static str {
        match self {
            Codec::Deflate => "deflate",
            Codec::Gzip => "gzip",
        }
    }

    /// All codecs in preference order
    pub fn all() -> &'static [Codec] {
        &[Codec::Gzip, Codec::Deflate]
    }

    /// Choose a codec from an `Accept-Encoding` header value.
    ///
    /// Gzip wins over deflate whenever both are acceptable, regardless of
    /// the q-values given. `*` accepts every codec not named explicitly. An
    /// explicit `q=0` refuses a coding even if `*` would otherwise allow it.
    pub fn negotiate(accept_encoding: &str) -> Option<Codec> {
        let mut wildcard = false;
        let mut accepted: Vec<Codec> = Vec::new();
        let mut refused: Vec<Codec> = Vec::new();

        for entry in accept_encoding.split(',') {
            let mut parts = entry.split(';');
            let token = parts.next().unwrap_or_default().trim();
            if token.is_empty() {
                continue;
            }

            let zero_quality = parts.any(|param| {
                let param = param.trim();
                param
                    .strip_prefix("q=")
                    .or_else(|| param.strip_prefix("Q="))
                    .and_then(|q| q.trim().parse::<f32>().ok())
                    .is_some_and(|q| q <= 0.0)
            });

            if token == "*" {
                wildcard = !zero_quality;
                continue;
            }

            if let Ok(codec) = token.parse::<Codec>() {
                if zero_quality {
                    refused.push(codec);
                } else {
                    accepted.push(codec);
                }
            }
        }

        Codec::all()
            .iter()
            .copied()
            .find(|codec| !refused.contains(codec) && (accepted.contains(codec) || wildcard))
    }
}

impl FromStr for Codec {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => Ok(Codec::Gzip),
            "deflate" => Ok(Codec::Deflate),
            other => Err(PoolError::UnsupportedEncoding(other.to_string())),
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content_encoding())
    }
}
