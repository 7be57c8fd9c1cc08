//! In-process fake IMAP server for integration testing
//!
//! Every client command starts with a **tag** the client picks; the
//! server echoes it in the completion line. Lines prefixed with `*`
//! are untagged data sent before that completion:
//!
//! ```text
//!   Client:  A0003 UID SEARCH ALL
//!   Server:  * SEARCH 1 2 3
//!   Server:  A0003 OK SEARCH completed
//! ```
//!
//! Message bodies travel as counted literals (`{bytecount}\r\n`
//! followed by exactly that many bytes), see `handlers::uid_fetch`.
//!
//! Each server speaks one [`Transport`]. The greeting goes out before
//! STARTTLS, or after the handshake for implicit TLS.

use super::handlers::{
    StoreArgs, handle_expunge, handle_login, handle_logout, handle_select, handle_uid_fetch,
    handle_uid_search, handle_uid_store,
};
use super::io::{complete, write_line};
use super::mailbox::{Mailbox, TestEmail};
use imap_codec::CommandCodec;
use imap_codec::decode::Decoder;
use imap_codec::imap_types::command::CommandBody;
use imap_codec::imap_types::mailbox::Mailbox as ImapMailbox;
use rcgen::generate_simple_self_signed;
use rustls::pki_types::PrivatePkcs8KeyDer;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;

const GREETING: &str = "* OK IMAP4rev1 Fake server ready\r\n";

/// How clients reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Unencrypted TCP (`/notls`). STARTTLS is refused.
    Plain,
    /// Plain greeting, then STARTTLS (`/tls`). Nothing else is
    /// accepted before the upgrade.
    StartTls,
    /// TLS from the first byte (`/ssl`).
    Tls,
}

impl Transport {
    /// Connection flags a client needs for this transport against the
    /// server's self-signed certificate.
    pub const fn client_flags(self) -> &'static str {
        match self {
            Self::Plain => "/imap/notls",
            Self::StartTls => "/imap/tls/novalidate-cert",
            Self::Tls => "/imap/ssl/novalidate-cert",
        }
    }
}

/// A fake IMAP server on `127.0.0.1` with an OS-assigned port.
///
/// A self-signed certificate for `127.0.0.1` is generated at startup
/// with `rcgen`. The accept loop runs until the server is dropped.
pub struct FakeImapServer {
    port: u16,
    transport: Transport,
    mailbox: Arc<Mutex<Mailbox>>,
    handle: tokio::task::JoinHandle<()>,
}

impl FakeImapServer {
    /// Start a STARTTLS server.
    pub async fn start(mailbox: Mailbox) -> Self {
        Self::start_with(mailbox, Transport::StartTls).await
    }

    pub async fn start_with(mailbox: Mailbox, transport: Transport) -> Self {
        // Several tests may race to install the provider.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind to ephemeral port");
        let port = listener.local_addr().unwrap().port();

        let cert = generate_simple_self_signed(vec!["127.0.0.1".to_string()])
            .expect("generate self-signed cert");
        let cert_der = cert.cert.der().clone();
        let key_der = PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

        let tls_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key_der.into())
            .expect("build server TLS config");
        let acceptor = TlsAcceptor::from(Arc::new(tls_config));

        let mailbox = Arc::new(Mutex::new(mailbox));
        let shared = mailbox.clone();

        let handle = tokio::spawn(async move {
            while let Ok((stream, _addr)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let mailbox = shared.clone();
                tokio::spawn(async move {
                    handle_connection(stream, transport, acceptor, &mailbox).await;
                });
            }
        });

        Self {
            port,
            transport,
            mailbox,
            handle,
        }
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub const fn transport(&self) -> Transport {
        self.transport
    }

    /// Snapshot of the server-side mailbox.
    pub fn mailbox(&self) -> Mailbox {
        self.mailbox.lock().unwrap().clone()
    }

    /// Append a message to the INBOX under the next free UID, as if it
    /// had just been delivered.
    ///
    /// # Panics
    ///
    /// Panics if the mailbox has no INBOX.
    pub fn deliver(&self, raw: &[u8]) -> u32 {
        let mut mb = self.mailbox.lock().unwrap();
        let inbox = mb.get_folder_mut("INBOX").expect("mailbox has an INBOX");
        let uid = inbox.max_uid() + 1;
        inbox.emails.push(TestEmail {
            uid,
            deleted: false,
            raw: raw.to_vec(),
        });
        uid
    }
}

impl Drop for FakeImapServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(
    stream: TcpStream,
    transport: Transport,
    acceptor: TlsAcceptor,
    mailbox: &Mutex<Mailbox>,
) {
    match transport {
        Transport::Plain => handle_imap_session(stream, mailbox, true).await,
        Transport::Tls => {
            let Ok(tls_stream) = acceptor.accept(stream).await else {
                return;
            };
            handle_imap_session(tls_stream, mailbox, true).await;
        }
        Transport::StartTls => {
            let Some(tcp) = negotiate_starttls(stream).await else {
                return;
            };
            let Ok(tls_stream) = acceptor.accept(tcp).await else {
                return;
            };
            handle_imap_session(tls_stream, mailbox, false).await;
        }
    }
}

/// Greet on the raw stream and wait for STARTTLS. Returns the stream
/// ready for the handshake, or `None` if the client asked for
/// anything else.
async fn negotiate_starttls(stream: TcpStream) -> Option<TcpStream> {
    let mut reader = BufReader::new(stream);
    write_line(&mut reader, GREETING).await.ok()?;

    let mut line = String::new();
    reader.read_line(&mut line).await.ok()?;

    let (tag, command) = line.trim().split_once(' ')?;
    if !command.eq_ignore_ascii_case("STARTTLS") {
        let _ = complete(&mut reader, tag, "BAD Expected STARTTLS").await;
        return None;
    }
    complete(&mut reader, tag, "OK Begin TLS negotiation now")
        .await
        .ok()?;

    Some(reader.into_inner())
}

fn mailbox_name(mb: &ImapMailbox<'_>) -> String {
    match mb {
        ImapMailbox::Inbox => "INBOX".to_string(),
        ImapMailbox::Other(other) => {
            let bytes: &[u8] = other.as_ref();
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// The folder a session has open and how it was opened.
struct Selection {
    folder: String,
    read_only: bool,
}

/// Run the IMAP command loop.
///
/// Commands are parsed with `imap-codec`'s `CommandCodec`. Read
/// handlers get a snapshot of the mailbox; STORE and EXPUNGE lock it
/// to mutate, and are refused on a session opened with EXAMINE.
#[allow(clippy::too_many_lines)]
async fn handle_imap_session<S: AsyncRead + AsyncWrite + Unpin>(
    stream: S,
    mailbox: &Mutex<Mailbox>,
    greet: bool,
) {
    let mut reader = BufReader::new(stream);
    if greet && write_line(&mut reader, GREETING).await.is_err() {
        return;
    }

    let mut authenticated = false;
    let mut selection: Option<Selection> = None;
    let codec = CommandCodec::default();

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Ok((_, command)) = codec.decode(line.as_bytes()) else {
            let tag = trimmed.split_whitespace().next().unwrap_or("*");
            if complete(&mut reader, tag, "BAD Parse error").await.is_err() {
                break;
            }
            continue;
        };

        let tag = command.tag.inner();
        let snap = mailbox.lock().unwrap().clone();
        let folder = selection.as_ref().map(|s| s.folder.as_str());
        let read_only = selection.as_ref().is_some_and(|s| s.read_only);

        match command.body {
            CommandBody::Login { .. } => {
                authenticated = handle_login(tag, !snap.reject_login, &mut reader).await;
            }
            CommandBody::Logout => {
                handle_logout(tag, &mut reader).await;
                break;
            }
            _ if !authenticated => {
                if complete(&mut reader, tag, "NO Not authenticated")
                    .await
                    .is_err()
                {
                    break;
                }
            }
            CommandBody::Select { mailbox: mb, .. } => {
                let name = mailbox_name(&mb);
                selection = handle_select(tag, &name, false, &snap, &mut reader)
                    .await
                    .map(|folder| Selection {
                        folder,
                        read_only: false,
                    });
            }
            CommandBody::Examine { mailbox: mb, .. } => {
                let name = mailbox_name(&mb);
                selection = handle_select(tag, &name, true, &snap, &mut reader)
                    .await
                    .map(|folder| Selection {
                        folder,
                        read_only: true,
                    });
            }
            CommandBody::Search {
                criteria,
                uid: true,
                ..
            } => {
                handle_uid_search(tag, criteria.as_ref(), &snap, folder, &mut reader).await;
            }
            CommandBody::Fetch {
                sequence_set,
                uid: true,
                ..
            } => {
                handle_uid_fetch(tag, &sequence_set, &snap, folder, &mut reader).await;
            }
            CommandBody::Store { .. } | CommandBody::Expunge if read_only => {
                if complete(&mut reader, tag, "NO Mailbox is read-only")
                    .await
                    .is_err()
                {
                    break;
                }
            }
            CommandBody::Store {
                ref sequence_set,
                uid: true,
                ref kind,
                ref response,
                ref flags,
                ..
            } => {
                let args = StoreArgs {
                    sequence_set,
                    kind,
                    response,
                    flags,
                };
                handle_uid_store(tag, &args, mailbox, folder, &mut reader).await;
            }
            CommandBody::Expunge => {
                handle_expunge(tag, mailbox, folder, &mut reader).await;
            }
            _ => {
                if complete(&mut reader, tag, "BAD Unknown command")
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
    }
}
