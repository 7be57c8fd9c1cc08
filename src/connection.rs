//! IMAP connection and TLS helpers
//!
//! Provides the low-level `connect()` and `open_inbox()` functions
//! used by [`MailboxClient`](crate::MailboxClient). The transport is
//! chosen from the configured [`ConnectionFlags`](crate::ConnectionFlags):
//! plain TCP, STARTTLS (required, or used when the server accepts it)
//! or implicit TLS, with or without certificate verification.

use crate::config::ImapConfig;
use crate::error::{Error, Result};
use crate::flags::Security;
use async_imap::Session;
use async_imap::error::Error as ImapError;
use rustls::pki_types::ServerName;
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info};

/// The mailbox every scenario works on.
pub const INBOX: &str = "INBOX";

/// Any byte stream an IMAP session can run over.
pub trait ImapStream: AsyncRead + AsyncWrite + Unpin + Send + fmt::Debug {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + fmt::Debug> ImapStream for T {}

/// An IMAP session over plain TCP or TLS.
pub type ImapSession = Session<Compat<Box<dyn ImapStream>>>;

/// Build a TLS connector.
///
/// With `validate_cert` the server must present a certificate that
/// chains to the `webpki-roots` trust anchors; without it every
/// certificate is accepted (self-signed test servers).
fn tls_connector(validate_cert: bool) -> Result<TlsConnector> {
    let builder = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| Error::Tls(format!("Unsupported protocol versions: {e}")))?;

    let config = if validate_cert {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder
            .with_root_certificates(root_store)
            .with_no_client_auth()
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
            .with_no_client_auth()
    };
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Perform the TLS handshake over an established TCP stream.
async fn wrap_tls(
    config: &ImapConfig,
    tcp_stream: TcpStream,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let connector = tls_connector(config.flags.validate_cert())?;
    let server_name = ServerName::try_from(config.host.clone())
        .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;

    connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| Error::Tls(e.to_string()))
}

/// Send STARTTLS on a fresh connection.
///
/// Returns the raw stream, plus the server's reason when it answered
/// `NO` or `BAD`. The stream is still usable in plain text then.
async fn request_starttls(tcp_stream: TcpStream) -> Result<(TcpStream, Option<String>)> {
    let mut client = async_imap::Client::new(tcp_stream.compat());
    let refusal = match client.run_command_and_check_ok("STARTTLS", None).await {
        Ok(()) => None,
        Err(ImapError::No(reason) | ImapError::Bad(reason)) => Some(reason),
        Err(e) => return Err(Error::Tls(format!("STARTTLS failed: {e}"))),
    };
    Ok((client.into_inner().into_inner(), refusal))
}

/// Open a fresh IMAP session.
///
/// Connects to `config.host:config.port` via TCP, secures the stream
/// according to `config.flags`, and logs in.
///
/// # Errors
///
/// [`Error::Io`] if the TCP connection fails, [`Error::Tls`] if
/// STARTTLS or the handshake fails, [`Error::Connection`] if the
/// server rejects the credentials.
pub async fn connect(config: &ImapConfig) -> Result<ImapSession> {
    let addr = format!("{}:{}", config.host, config.port);
    let security = config.flags.security();
    debug!("Connecting to IMAP server at {} ({:?})", addr, security);

    let tcp_stream = TcpStream::connect(&addr).await?;

    let stream: Box<dyn ImapStream> = match security {
        Security::Plain => Box::new(tcp_stream),
        Security::Opportunistic => match request_starttls(tcp_stream).await? {
            (tcp_stream, None) => Box::new(wrap_tls(config, tcp_stream).await?),
            (tcp_stream, Some(reason)) => {
                info!("{} refused STARTTLS ({}), staying in plain text", addr, reason);
                Box::new(tcp_stream)
            }
        },
        Security::StartTls => match request_starttls(tcp_stream).await? {
            (tcp_stream, None) => Box::new(wrap_tls(config, tcp_stream).await?),
            (_, Some(reason)) => {
                return Err(Error::Tls(format!("STARTTLS failed: {reason}")));
            }
        },
        Security::Tls => Box::new(wrap_tls(config, tcp_stream).await?),
    };

    let client = async_imap::Client::new(stream.compat());

    let session = client
        .login(&config.username, &config.password)
        .await
        .map_err(|(e, _)| Error::Connection(format!("Login failed: {e}")))?;

    info!("Connected to IMAP server as {}", config.username);
    Ok(session)
}

/// SELECT (or EXAMINE, when `read_only`) the INBOX.
///
/// # Errors
///
/// Returns [`Error::Connection`] if the server refuses the mailbox.
pub async fn open_inbox(session: &mut ImapSession, read_only: bool) -> Result<()> {
    let opened = if read_only {
        session.examine(INBOX).await
    } else {
        session.select(INBOX).await
    };

    let mailbox =
        opened.map_err(|e| Error::Connection(format!("Failed to select {INBOX}: {e}")))?;
    debug!("{} opened with {} message(s)", INBOX, mailbox.exists);
    Ok(())
}

/// Certificate verifier that accepts all certificates
/// (`novalidate-cert`).
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
