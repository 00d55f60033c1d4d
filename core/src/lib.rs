//! Core types and time arithmetic shared by the domainwatch engine.

pub mod quantum;
pub mod store;

use serde::Serialize;
use time::OffsetDateTime;

pub use store::{RoundCommit, SampleStore};

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// One configured endpoint, with the category of the nearest preceding heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetEntry {
    pub identifier: String,
    pub category: Option<String>,
}

/// Outcome of the certificate check for one target.
///
/// For targets whose scheme carries no TLS the verdict is [`TlsVerdict::not_applicable`],
/// which is the same shape as a failed check and must be read as "no data".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TlsVerdict {
    pub valid: bool,
    pub days_remaining: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl TlsVerdict {
    pub const fn not_applicable() -> Self {
        TlsVerdict { valid: false, days_remaining: 0, expires_at: None }
    }
}

impl Default for TlsVerdict {
    fn default() -> Self { Self::not_applicable() }
}

/// Result of probing one target in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub target: String,
    pub reachable: bool,
    pub tls: TlsVerdict,
    #[serde(with = "time::serde::rfc3339")]
    pub observed_at: OffsetDateTime,
}

impl CheckResult {
    /// Terminal result for a target that could not be probed at all.
    pub fn unreachable(target: impl Into<String>, observed_at: OffsetDateTime) -> Self {
        CheckResult { target: target.into(), reachable: false, tls: TlsVerdict::not_applicable(), observed_at }
    }
}

/// A persisted row. `None` measurement fields mark a synthetic gap row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub target: String,
    pub reachable: Option<bool>,
    pub tls_valid: Option<bool>,
    pub tls_days_remaining: Option<i64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub tls_expires_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub observed_at: OffsetDateTime,
}

impl Sample {
    pub fn gap(target: impl Into<String>, observed_at: OffsetDateTime) -> Self {
        Sample {
            target: target.into(),
            reachable: None,
            tls_valid: None,
            tls_days_remaining: None,
            tls_expires_at: None,
            observed_at,
        }
    }

    pub fn is_gap(&self) -> bool {
        self.reachable.is_none() && self.tls_valid.is_none()
    }
}

impl From<&CheckResult> for Sample {
    fn from(r: &CheckResult) -> Self {
        Sample {
            target: r.target.clone(),
            reachable: Some(r.reachable),
            tls_valid: Some(r.tls.valid),
            tls_days_remaining: Some(r.tls.days_remaining),
            tls_expires_at: r.tls.expires_at,
            observed_at: r.observed_at,
        }
    }
}
