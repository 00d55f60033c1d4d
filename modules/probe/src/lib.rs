//! Reachability and certificate probes for one target.
//!
//! `http`/`https` targets are reachable when a GET returns 2xx. `wss`/`ssl` targets are
//! reachable when a TLS handshake completes. Secure schemes additionally get a
//! certificate verdict from a handshake that skips transport-level verification.

mod http;
mod tls;

use cert_check::PeerCertificate;
use domainwatch_core::{CheckResult, TlsVerdict};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Semaphore;
use tokio_rustls::TlsConnector;
use url::Url;

const DEFAULT_TLS_PORT: u16 = 443;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid target {target:?}: {source}")]
    InvalidTarget { target: String, source: url::ParseError },
    #[error("invalid server name {0:?}")]
    ServerName(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("tls configuration: {0}")]
    Tls(#[from] rustls::Error),
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    Wss,
    Ssl,
    Other,
}

impl Scheme {
    pub fn of(url: &Url) -> Self {
        match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            "wss" => Scheme::Wss,
            "ssl" => Scheme::Ssl,
            _ => Scheme::Other,
        }
    }
}

/// Bare hosts are treated as `https://host`.
pub fn normalize(identifier: &str) -> Result<Url, ProbeError> {
    let raw = if identifier.contains("://") { identifier.to_string() } else { format!("https://{identifier}") };
    Url::parse(&raw).map_err(|source| ProbeError::InvalidTarget { target: identifier.to_string(), source })
}

fn host_of(url: &Url) -> Option<String> {
    let host = url.host_str()?.trim_start_matches('[').trim_end_matches(']');
    (!host.is_empty()).then(|| host.to_string())
}

/// Stateless apart from pooled clients; clone freely across tasks.
#[derive(Clone)]
pub struct Prober {
    http: Client,
    tls: TlsConnector,
    timeout: Duration,
}

impl Prober {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        Ok(Prober { http: http::client(timeout)?, tls: tls::unverified_connector()?, timeout })
    }

    /// Probe one target. Never fails: every error becomes a negative result.
    pub async fn probe(&self, identifier: &str) -> CheckResult {
        let url = match normalize(identifier) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(target_id = identifier, error = %e, "unparseable target");
                return CheckResult::unreachable(identifier, OffsetDateTime::now_utc());
            }
        };
        let scheme = Scheme::of(&url);
        let Some(host) = host_of(&url) else {
            tracing::warn!(target_id = identifier, "target has no host");
            return CheckResult::unreachable(identifier, OffsetDateTime::now_utc());
        };
        let port = url.port().unwrap_or(DEFAULT_TLS_PORT);

        let (reachable, tls) = match scheme {
            Scheme::Http => (http::is_reachable(&self.http, &url).await, TlsVerdict::not_applicable()),
            Scheme::Https => {
                let reachable = http::is_reachable(&self.http, &url).await;
                let tls = match self.handshake(&host, port).await {
                    Ok(cert) => verdict(cert.as_deref(), &host),
                    Err(_) => TlsVerdict::not_applicable(),
                };
                (reachable, tls)
            }
            // one handshake answers both questions
            Scheme::Wss | Scheme::Ssl => match self.handshake(&host, port).await {
                Ok(cert) => (true, verdict(cert.as_deref(), &host)),
                Err(_) => (false, TlsVerdict::not_applicable()),
            },
            Scheme::Other => {
                tracing::debug!(target_id = identifier, scheme = url.scheme(), "unsupported scheme");
                (false, TlsVerdict::not_applicable())
            }
        };

        CheckResult { target: identifier.to_string(), reachable, tls, observed_at: OffsetDateTime::now_utc() }
    }

    async fn handshake(&self, host: &str, port: u16) -> Result<Option<Vec<u8>>, ProbeError> {
        let cert = tls::peer_certificate(&self.tls, host, port, self.timeout).await.map_err(|e| {
            tracing::debug!(host, port, error = %e, "tls handshake failed");
            e
        })?;
        Ok(cert.map(|c| c.as_ref().to_vec()))
    }

    /// Probe every identifier concurrently, at most `concurrency` at a time. Results come
    /// back in input order once all probes have finished.
    pub async fn probe_all(&self, identifiers: Vec<String>, concurrency: usize) -> Vec<CheckResult> {
        let sem = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut handles = Vec::with_capacity(identifiers.len());
        for id in identifiers {
            let sem = sem.clone();
            let prober = self.clone();
            let task_id = id.clone();
            let handle = tokio::spawn(async move {
                let _permit = sem.acquire_owned().await;
                prober.probe(&task_id).await
            });
            handles.push((id, handle));
        }
        let mut out = Vec::with_capacity(handles.len());
        for (id, h) in handles {
            match h.await {
                Ok(r) => out.push(r),
                Err(e) => {
                    tracing::error!(target_id = %id, error = %e, "probe task failed");
                    out.push(CheckResult::unreachable(id, OffsetDateTime::now_utc()));
                }
            }
        }
        out
    }
}

fn verdict(der: Option<&[u8]>, host: &str) -> TlsVerdict {
    let Some(der) = der else { return TlsVerdict::not_applicable() };
    match PeerCertificate::from_der(der) {
        Ok(cert) => cert_check::validate(&cert, host, OffsetDateTime::now_utc()),
        Err(e) => {
            tracing::debug!(host, error = %e, "unreadable peer certificate");
            TlsVerdict::not_applicable()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prober() -> Prober {
        Prober::new(Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn bare_host_becomes_https() {
        let u = normalize("example.com").unwrap();
        assert_eq!(u.scheme(), "https");
        assert_eq!(u.host_str(), Some("example.com"));
        assert_eq!(u.port().unwrap_or(DEFAULT_TLS_PORT), 443);
    }

    #[test]
    fn explicit_schemes_kept() {
        let u = normalize("ssl://mail.example.com:993").unwrap();
        assert_eq!(Scheme::of(&u), Scheme::Ssl);
        assert_eq!(host_of(&u).as_deref(), Some("mail.example.com"));
        assert_eq!(u.port(), Some(993));

        let u = normalize("wss://chat.example.com/socket").unwrap();
        assert_eq!(Scheme::of(&u), Scheme::Wss);
        assert_eq!(u.port().unwrap_or(DEFAULT_TLS_PORT), 443);

        assert_eq!(Scheme::of(&normalize("http://example.com").unwrap()), Scheme::Http);
        assert_eq!(Scheme::of(&normalize("ftp://example.com").unwrap()), Scheme::Other);
    }

    #[test]
    fn ipv6_brackets_stripped() {
        let u = normalize("https://[2001:db8::1]:8443").unwrap();
        assert_eq!(host_of(&u).as_deref(), Some("2001:db8::1"));
        assert_eq!(u.port(), Some(8443));
    }

    #[test]
    fn invalid_identifier_is_rejected() {
        assert!(matches!(normalize("http://[::1"), Err(ProbeError::InvalidTarget { .. })));
        assert!(normalize("exa mple.com").is_err());
    }

    #[tokio::test]
    async fn parse_failure_is_terminal_and_neutral() {
        let r = prober().probe("http://[::1").await;
        assert_eq!(r.target, "http://[::1");
        assert!(!r.reachable);
        assert_eq!(r.tls, TlsVerdict::not_applicable());
    }

    #[tokio::test]
    async fn unsupported_scheme_is_unreachable() {
        let r = prober().probe("ftp://files.example.com").await;
        assert!(!r.reachable);
        assert_eq!(r.tls, TlsVerdict::not_applicable());
    }

    #[tokio::test]
    async fn probe_all_keeps_input_order() {
        let ids = vec!["ftp://b.example.com".to_string(), "http://[::1".to_string(), "gopher://a.example.com".to_string()];
        let results = prober().probe_all(ids.clone(), 2).await;
        assert_eq!(results.iter().map(|r| r.target.clone()).collect::<Vec<_>>(), ids);
        assert!(results.iter().all(|r| !r.reachable));
    }

    #[test]
    fn missing_certificate_is_neutral() {
        assert_eq!(verdict(None, "example.com"), TlsVerdict::not_applicable());
        assert_eq!(verdict(Some(b"junk".as_slice()), "example.com"), TlsVerdict::not_applicable());
    }
}
