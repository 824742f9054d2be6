//! Provider roles and registration info.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// What a registered adapter is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderRole {
    /// Vector-store backends.
    Vector,
    /// Embedding / completion backends.
    Llm,
}

impl fmt::Display for ProviderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderRole::Vector => write!(f, "vector"),
            ProviderRole::Llm => write!(f, "llm"),
        }
    }
}

impl FromStr for ProviderRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vector" => Ok(ProviderRole::Vector),
            "llm" => Ok(ProviderRole::Llm),
            other => Err(format!("invalid provider role: '{other}'")),
        }
    }
}

/// Snapshot of one registration, for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub role: ProviderRole,
    pub name: String,
    pub is_default: bool,
}
