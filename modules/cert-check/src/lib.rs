//! Certificate validity as the monitor sees it: expiry window plus hostname match
//! against SAN DNS names (or the subject CN when no SAN is present). Chain trust is
//! not checked.

use domainwatch_core::TlsVerdict;
use time::OffsetDateTime;
use x509_parser::prelude::{FromDer, GeneralName, X509Certificate};

const DAY_MS: i128 = 86_400_000;

#[derive(Debug, thiserror::Error)]
pub enum CertParseError {
    #[error("malformed certificate: {0}")]
    Der(String),
}

/// The fields of a peer certificate the verdict depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerCertificate {
    pub common_name: Option<String>,
    pub dns_names: Vec<String>,
    pub not_before: Option<OffsetDateTime>,
    pub not_after: Option<OffsetDateTime>,
}

impl PeerCertificate {
    pub fn from_der(der: &[u8]) -> Result<Self, CertParseError> {
        let (_, x509) = X509Certificate::from_der(der).map_err(|e| CertParseError::Der(e.to_string()))?;
        let common_name = x509
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string);
        let dns_names = match x509.subject_alternative_name() {
            Ok(Some(san)) => san
                .value
                .general_names
                .iter()
                .filter_map(|n| match n {
                    GeneralName::DNSName(name) => Some(name.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        let validity = x509.validity();
        Ok(PeerCertificate {
            common_name,
            dns_names,
            not_before: Some(validity.not_before.to_datetime()),
            not_after: Some(validity.not_after.to_datetime()),
        })
    }
}

pub fn validate(cert: &PeerCertificate, hostname: &str, now: OffsetDateTime) -> TlsVerdict {
    let Some(not_after) = cert.not_after else {
        return TlsVerdict::not_applicable();
    };
    let name_ok = if cert.dns_names.is_empty() {
        cert.common_name.as_deref().is_some_and(|cn| hostname_matches(hostname, cn))
    } else {
        cert.dns_names.iter().any(|n| hostname_matches(hostname, n))
    };
    let in_window = cert.not_before.map_or(true, |nb| now >= nb) && now <= not_after;
    TlsVerdict {
        valid: in_window && name_ok,
        days_remaining: days_remaining(now, not_after),
        expires_at: Some(not_after),
    }
}

/// Whole days from `now` until `not_after`, rounded toward negative infinity.
/// Negative once the certificate has expired.
pub fn days_remaining(now: OffsetDateTime, not_after: OffsetDateTime) -> i64 {
    (not_after - now).whole_milliseconds().div_euclid(DAY_MS) as i64
}

/// Case-insensitive exact match, or a `*.suffix` wildcard covering exactly one label.
pub fn hostname_matches(hostname: &str, pattern: &str) -> bool {
    let host = hostname.to_ascii_lowercase();
    let pattern = pattern.trim().to_ascii_lowercase();
    if pattern.is_empty() {
        return false;
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        if suffix.starts_with('.') {
            return host.ends_with(suffix) && label_count(&host) == label_count(&pattern);
        }
    }
    host == pattern
}

fn label_count(name: &str) -> usize {
    name.split('.').count()
}
