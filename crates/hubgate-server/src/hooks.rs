//! Push webhook support: signature verification and payload inspection.

use hmac::{Hmac, Mac};
use hubgate_refs::{branch_from_ref, strip_heads_prefix};
use hubgate_types::RepositoryCoordinate;
use serde_json::Value;
use sha2::Sha256;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const EVENT_HEADER: &str = "x-github-event";

const SIGNATURE_PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

/// Checks `X-Hub-Signature-256` against a shared secret.
#[derive(Clone, Debug, Default)]
pub struct WebhookVerifier {
    secret: Option<Vec<u8>>,
}

impl WebhookVerifier {
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()).map(|s| s.as_bytes().to_vec()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// True when `signature` is the HMAC-SHA256 of `body`. Always true when
    /// no secret is configured.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> bool {
        let Some(mac) = self.mac(body) else {
            return !self.enabled();
        };
        let Some(expected) = signature
            .and_then(|s| s.strip_prefix(SIGNATURE_PREFIX))
            .and_then(|h| hex::decode(h).ok())
        else {
            return false;
        };
        mac.verify_slice(&expected).is_ok()
    }

    /// Header value for `body`, or `None` without a secret.
    pub fn sign(&self, body: &[u8]) -> Option<String> {
        let mac = self.mac(body)?;
        Some(format!(
            "{SIGNATURE_PREFIX}{}",
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    fn mac(&self, body: &[u8]) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_deref()?).ok()?;
        mac.update(body);
        Some(mac)
    }
}

/// Branch a delivery refers to: the `ref` query parameter, then the
/// payload's `ref` when it names a branch, then `default_branch`.
pub fn pushed_branch(query_ref: Option<&str>, payload: &Value, default_branch: &str) -> String {
    query_ref
        .map(strip_heads_prefix)
        .filter(|b| !b.is_empty())
        .or_else(|| payload.get("ref").and_then(Value::as_str).and_then(branch_from_ref))
        .unwrap_or(default_branch)
        .to_string()
}

/// Repository named by the payload, if it carries one.
pub fn pushed_repository(payload: &Value) -> Option<RepositoryCoordinate> {
    let repository = payload.get("repository")?;
    let owner = repository
        .pointer("/owner/login")
        .or_else(|| repository.pointer("/owner/name"))
        .and_then(Value::as_str)?;
    let name = repository.get("name").and_then(Value::as_str)?;
    RepositoryCoordinate::new(owner, name).ok()
}
