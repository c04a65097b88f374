//! TLS wrapping around the raw TCP stream, adapted from the host's
//! rustls-based transport. Adds the `seclevel` and verification-mode knobs
//! the spec requires that a single fixed posture doesn't expose.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, RootCertStore};

use super::TlsConfig;
use crate::error::TransportError;

/// `ZTI_SECLEVEL`: an OpenSSL-style minimum-protocol floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecLevel {
    /// No additional floor beyond rustls's own defaults (no SSLv3/TLS1.0
    /// support exists in rustls, so this is the same floor as `Modern`
    /// in practice, but is kept distinct to honor the `0` value on the wire).
    Compatible,
    /// TLS 1.2 minimum.
    #[default]
    Modern,
    /// TLS 1.3 only.
    Strict,
}

impl SecLevel {
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => SecLevel::Compatible,
            2 => SecLevel::Strict,
            _ => SecLevel::Modern,
        }
    }

    fn protocol_versions(self) -> &'static [&'static rustls::SupportedProtocolVersion] {
        match self {
            SecLevel::Compatible | SecLevel::Modern => &[&rustls::version::TLS12, &rustls::version::TLS13],
            SecLevel::Strict => &[&rustls::version::TLS13],
        }
    }
}

/// `SESSION_SSL_VERIFY`: how strictly the peer certificate is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyMode {
    /// Accept any certificate. Only ever selected by explicit operator
    /// configuration, never a fallback (§7 propagation policy).
    None,
    /// Validate the certificate chain against trusted roots but do not
    /// require the presented name to match the connected host.
    Cert,
    /// Full validation: chain plus hostname match.
    #[default]
    Hostname,
}

impl std::str::FromStr for VerifyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(VerifyMode::None),
            "cert" => Ok(VerifyMode::Cert),
            "hostname" => Ok(VerifyMode::Hostname),
            other => Err(format!("unknown verify mode: {other}")),
        }
    }
}

#[derive(Debug)]
struct AcceptAllVerifier;

impl ServerCertVerifier for AcceptAllVerifier {
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
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider().signature_verification_algorithms.supported_schemes()
    }
}

/// Validates the chain exactly like the default webpki verifier, but
/// treats a hostname mismatch on an otherwise-valid chain as success —
/// `SESSION_SSL_VERIFY=cert` wants "is this a CA-issued cert" without
/// "is it issued *to this name*".
#[derive(Debug)]
struct ChainOnlyVerifier {
    inner: Arc<dyn ServerCertVerifier>,
}

impl ServerCertVerifier for ChainOnlyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match self.inner.verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now) {
            Ok(ok) => Ok(ok),
            Err(rustls::Error::InvalidCertificate(rustls::CertificateError::NotValidForName)) => {
                Ok(ServerCertVerified::assertion())
            }
            Err(e) => Err(e),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

fn root_store(ca_bundle_path: Option<&str>) -> Result<RootCertStore, TransportError> {
    let mut roots = RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs().map_err(|e| TransportError::Tls {
        message: format!("failed to load native certificates: {e}"),
    })? {
        roots.add(cert).map_err(|e| TransportError::Tls { message: e.to_string() })?;
    }
    if let Some(path) = ca_bundle_path {
        for der in load_pem_bundle(path)? {
            roots.add(der).map_err(|e| TransportError::Tls { message: e.to_string() })?;
        }
    }
    Ok(roots)
}

/// Hand-rolled PEM -> DER extraction, avoiding a dependency on a PEM
/// parsing crate the rest of the stack has no other use for; `base64` is
/// already part of the dependency set.
fn load_pem_bundle(path: &str) -> Result<Vec<CertificateDer<'static>>, TransportError> {
    use base64::Engine;

    let bytes = std::fs::read(path).map_err(|e| TransportError::Tls {
        message: format!("failed to read CA bundle {path}: {e}"),
    })?;
    if bytes.len() > 10_000_000 {
        return Err(TransportError::Tls { message: "CA bundle exceeds 10MB limit".into() });
    }
    let text = String::from_utf8(bytes)
        .map_err(|_| TransportError::Tls { message: "CA bundle is not valid UTF-8 PEM".into() })?;

    const BEGIN: &str = "-----BEGIN CERTIFICATE-----";
    const END: &str = "-----END CERTIFICATE-----";
    let mut certs = Vec::new();
    let mut cursor = 0usize;
    while let Some(begin_rel) = text[cursor..].find(BEGIN) {
        let body_start = cursor + begin_rel + BEGIN.len();
        let Some(end_rel) = text[body_start..].find(END) else { break };
        let body_end = body_start + end_rel;
        let b64: String = text[body_start..body_end]
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let der = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| TransportError::Tls { message: format!("invalid certificate base64: {e}") })?;
        certs.push(CertificateDer::from(der));
        cursor = body_end + END.len();
    }
    Ok(certs)
}

fn build_client_config(cfg: &TlsConfig) -> Result<Arc<ClientConfig>, TransportError> {
    let roots = root_store(cfg.ca_bundle_path.as_deref())?;
    let builder = ClientConfig::builder_with_protocol_versions(cfg.seclevel.protocol_versions());

    let config = match cfg.verify {
        VerifyMode::Hostname => builder.with_root_certificates(roots).with_no_client_auth(),
        VerifyMode::None => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAllVerifier))
            .with_no_client_auth(),
        VerifyMode::Cert => {
            let inner = rustls::client::WebPkiServerVerifier::builder(Arc::new(roots))
                .build()
                .map_err(|e| TransportError::Tls { message: e.to_string() })?;
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(ChainOnlyVerifier { inner }))
                .with_no_client_auth()
        }
    };
    Ok(Arc::new(config))
}

pub(super) struct TlsStream {
    conn: ClientConnection,
    tcp: TcpStream,
}

impl TlsStream {
    pub(super) fn connect(tcp: TcpStream, host: &str, cfg: &TlsConfig) -> Result<Self, TransportError> {
        let config = build_client_config(cfg)?;
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| TransportError::InvalidAddress { address: host.to_string() })?;
        let conn = ClientConnection::new(config, server_name)
            .map_err(|e| TransportError::Tls { message: e.to_string() })?;
        Ok(Self { conn, tcp })
    }

    pub(super) fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        self.tcp.set_read_timeout(timeout)
    }
}

impl Read for TlsStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        rustls::Stream::new(&mut self.conn, &mut self.tcp).read(buf)
    }
}

impl Write for TlsStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        rustls::Stream::new(&mut self.conn, &mut self.tcp).write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        rustls::Stream::new(&mut self.conn, &mut self.tcp).flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn seclevel_maps_from_wire_values() {
        assert_eq!(SecLevel::from_level(0), SecLevel::Compatible);
        assert_eq!(SecLevel::from_level(1), SecLevel::Modern);
        assert_eq!(SecLevel::from_level(2), SecLevel::Strict);
        assert_eq!(SecLevel::from_level(9), SecLevel::Modern);
    }

    #[test]
    fn verify_mode_parses_from_str() {
        assert_eq!(VerifyMode::from_str("none").unwrap(), VerifyMode::None);
        assert_eq!(VerifyMode::from_str("Cert").unwrap(), VerifyMode::Cert);
        assert_eq!(VerifyMode::from_str("HOSTNAME").unwrap(), VerifyMode::Hostname);
        assert!(VerifyMode::from_str("bogus").is_err());
    }
}
