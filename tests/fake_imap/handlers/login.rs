//! LOGIN command handler.
//!
//! Credentials are not inspected; the mailbox decides whether every
//! login succeeds or every login is refused.

use crate::fake_imap::io::complete;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Answer LOGIN. Returns whether the session is now authenticated.
pub async fn handle_login<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    accept: bool,
    stream: &mut BufReader<S>,
) -> bool {
    let status = if accept {
        "OK LOGIN completed"
    } else {
        "NO LOGIN failed: invalid credentials"
    };
    complete(stream, tag, status).await.is_ok() && accept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::collect_output;

    async fn run(tag: &str, accept: bool) -> (String, bool) {
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        let authenticated = handle_login(tag, accept, &mut stream).await;
        drop(stream);
        (collect_output(client).await, authenticated)
    }

    #[tokio::test]
    async fn accepts() {
        let (output, authenticated) = run("A0001", true).await;
        assert!(authenticated);
        assert_eq!(output, "A0001 OK LOGIN completed\r\n");
    }

    #[tokio::test]
    async fn rejects_with_no() {
        let (output, authenticated) = run("A0001", false).await;
        assert!(!authenticated);
        assert!(output.starts_with("A0001 NO "));
    }
}
