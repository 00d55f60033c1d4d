use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

use crate::ProbeError;

/// Accepts whatever the server presents; the verdict is computed afterwards by
/// `cert_check::validate`.
#[derive(Debug)]
struct AcceptAnyCertificate {
    schemes: Vec<SignatureScheme>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.schemes.clone()
    }
}

pub(crate) fn unverified_connector() -> Result<TlsConnector, ProbeError> {
    let provider: Arc<CryptoProvider> = Arc::new(ring::default_provider());
    let schemes = provider.signature_verification_algorithms.supported_schemes();
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { schemes }))
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

fn server_name(host: &str) -> Result<ServerName<'static>, ProbeError> {
    match host.parse::<std::net::IpAddr>() {
        Ok(ip) => Ok(ServerName::IpAddress(ip.into())),
        Err(_) => ServerName::try_from(host.to_owned()).map_err(|_| ProbeError::ServerName(host.to_owned())),
    }
}

/// Complete a TLS handshake with `host:port` and return the end-entity certificate,
/// if the server sent one. Connect and handshake share one `limit`.
pub(crate) async fn peer_certificate(
    connector: &TlsConnector,
    host: &str,
    port: u16,
    limit: Duration,
) -> Result<Option<CertificateDer<'static>>, ProbeError> {
    let name = server_name(host)?;
    let handshake = async {
        let stream = TcpStream::connect((host, port)).await?;
        let tls = connector.connect(name, stream).await?;
        let (_, conn) = tls.get_ref();
        Ok::<_, ProbeError>(conn.peer_certificates().and_then(|certs| certs.first()).cloned())
    };
    timeout(limit, handshake).await.map_err(|_| ProbeError::Timeout(limit))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_names_for_hosts_and_ips() {
        assert!(matches!(server_name("192.0.2.7").unwrap(), ServerName::IpAddress(_)));
        assert!(matches!(server_name("::1").unwrap(), ServerName::IpAddress(_)));
        assert!(matches!(server_name("chat.example.com").unwrap(), ServerName::DnsName(_)));
        assert!(server_name("bad host").is_err());
    }

    #[test]
    fn connector_builds_without_global_provider() {
        assert!(unverified_connector().is_ok());
    }
}
