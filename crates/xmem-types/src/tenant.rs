//! Tenant identity and per-tenant collection naming.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use std::fmt;

/// Opaque tenant identifier issued by the identity provider.
///
/// The core never derives a tenant from request content; callers resolve it
/// from a validated credential and pass it explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of this tenant's vector collection.
    ///
    /// A pure function of the tenant id. The id is hashed rather than
    /// sanitized, so two distinct ids can never map to the same name and a
    /// tenant cannot pick an id that lands on another tenant's collection.
    pub fn collection_name(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let hex: String = digest.iter().take(16).map(|b| format!("{b:02x}")).collect();
        format!("tenant_{hex}_memories")
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name_is_deterministic() {
        let t = TenantId::new("user-42");
        assert_eq!(t.collection_name(), t.collection_name());
        assert_eq!(t.collection_name(), TenantId::new("user-42").collection_name());
    }

    #[test]
    fn test_collection_name_shape() {
        let name = TenantId::new("user-42").collection_name();
        assert!(name.starts_with("tenant_"));
        assert!(name.ends_with("_memories"));
        // 16 bytes of digest as hex
        assert_eq!(name.len(), "tenant_".len() + 32 + "_memories".len());
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn test_collection_name_distinguishes_lookalike_ids() {
        let a = TenantId::new("a-b").collection_name();
        let b = TenantId::new("a_b").collection_name();
        let c = TenantId::new("A-B").collection_name();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_tenant_id_serde_transparent() {
        let json = serde_json::to_string(&TenantId::new("t1")).unwrap();
        assert_eq!(json, "\"t1\"");
    }
}
