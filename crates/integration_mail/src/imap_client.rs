//! IMAP mailbox adapter
//!
//! Implements the application's mailbox port against the hosted providers'
//! IMAP servers. Uses the synchronous `imap` crate wrapped in
//! `spawn_blocking`; the session is owned by the connection object and
//! moved in and out of the blocking closures per operation.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use application::ports::{
    MailboxConnection, MailboxError, MailboxPort, MessageMeta, MonitoredAccount,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use imap::Session;
use tokio::task;
use tracing::{debug, error, instrument, warn};

use crate::{ImapEndpoint, MailTlsConfig, ProviderEndpoints, build_tls_connector};

/// Type alias for IMAP session over TLS
type ImapSession = Session<native_tls::TlsStream<TcpStream>>;

/// IMAP implementation of the mailbox port
#[derive(Debug, Clone)]
pub struct ImapMailbox {
    endpoints: ProviderEndpoints,
    tls: MailTlsConfig,
}

impl ImapMailbox {
    /// Create an adapter over the given provider endpoints
    #[must_use]
    pub fn new(endpoints: ProviderEndpoints, tls: MailTlsConfig) -> Self {
        Self { endpoints, tls }
    }

    /// Adapter for the well-known hosted providers
    #[must_use]
    pub fn hosted() -> Self {
        Self::new(ProviderEndpoints::hosted(), MailTlsConfig::default())
    }

    /// Establishes a new IMAP session (blocking)
    fn connect_sync(
        endpoint: &ImapEndpoint,
        account: &MonitoredAccount,
        tls_config: &MailTlsConfig,
        timeout: Duration,
    ) -> Result<ImapSession, MailboxError> {
        let addr = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|e| MailboxError::Connection(format!("address resolution failed: {e}")))?
            .next()
            .ok_or_else(|| {
                MailboxError::Connection(format!("no address for {}", endpoint.host))
            })?;

        debug!(host = %endpoint.host, port = endpoint.port, "Connecting to IMAP server");

        let tcp_stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            error!(error = %e, "Failed to connect to IMAP server");
            MailboxError::Connection(format!("TCP connection failed: {e}"))
        })?;

        // The socket-level timeouts keep login and later commands from
        // outliving the engine's deadline.
        tcp_stream
            .set_read_timeout(Some(timeout))
            .and_then(|()| tcp_stream.set_write_timeout(Some(timeout)))
            .map_err(|e| MailboxError::Connection(format!("socket timeout setup failed: {e}")))?;

        let tls = build_tls_connector(tls_config)
            .map_err(|e| MailboxError::Connection(e.to_string()))?;

        let tls_stream = tls.connect(&endpoint.host, tcp_stream).map_err(|e| {
            error!(error = %e, "TLS handshake failed");
            MailboxError::Connection(format!("TLS handshake failed: {e}"))
        })?;

        let client = imap::Client::new(tls_stream);
        let session = client
            .login(&account.credentials.user, &account.credentials.password)
            .map_err(|e| {
                error!(error = ?e.0, "IMAP login failed");
                MailboxError::Authentication(account.address.to_string())
            })?;

        debug!("IMAP login successful");
        Ok(session)
    }
}

#[async_trait]
impl MailboxPort for ImapMailbox {
    #[instrument(skip(self, account), fields(address = %account.address))]
    async fn connect(
        &self,
        account: &MonitoredAccount,
        timeout: Duration,
    ) -> Result<Box<dyn MailboxConnection>, MailboxError> {
        let endpoint = self
            .endpoints
            .get(account.provider)
            .ok_or_else(|| {
                MailboxError::Connection(format!("no IMAP endpoint for {}", account.provider))
            })?
            .clone();
        let account = account.clone();
        let tls = self.tls.clone();

        let session =
            task::spawn_blocking(move || Self::connect_sync(&endpoint, &account, &tls, timeout))
                .await
                .map_err(|e| MailboxError::Connection(format!("task join error: {e}")))??;

        Ok(Box::new(ImapMailboxConnection {
            session: Some(session),
        }))
    }
}

/// One open IMAP session, consumed through the mailbox connection trait
struct ImapMailboxConnection {
    session: Option<ImapSession>,
}

impl ImapMailboxConnection {
    fn take_session(&mut self) -> Result<ImapSession, MailboxError> {
        self.session
            .take()
            .ok_or_else(|| MailboxError::Connection("connection already closed".to_string()))
    }
}

/// Build the IMAP SEARCH query for a probe token
fn search_query(token: &str) -> String {
    format!("TEXT \"{token}\"")
}

/// Decode an envelope subject, tolerating non-UTF8 bytes
fn decode_subject(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_string()
}

/// Parse an RFC 2822 date header into UTC
fn parse_header_date(raw: &[u8]) -> Option<DateTime<Utc>> {
    let text = String::from_utf8_lossy(raw);
    let timestamp = mailparse::dateparse(text.as_ref()).ok()?;
    DateTime::from_timestamp(timestamp, 0)
}

#[async_trait]
impl MailboxConnection for ImapMailboxConnection {
    async fn open_folder(&mut self, name: &str) -> Result<(), MailboxError> {
        let mut session = self.take_session()?;
        let folder = name.to_string();

        let (session, result) = task::spawn_blocking(move || {
            // Read-only EXAMINE: searching must not flip \Seen flags
            let result = session.examine(&folder).map(|_| ()).map_err(|e| {
                if e.to_string().contains("NO") {
                    MailboxError::FolderNotFound(folder.clone())
                } else {
                    MailboxError::Search(format!("failed to open folder {folder}: {e}"))
                }
            });
            (session, result)
        })
        .await
        .map_err(|e| MailboxError::Connection(format!("task join error: {e}")))?;

        self.session = Some(session);
        result
    }

    async fn search_text(&mut self, token: &str) -> Result<Vec<u32>, MailboxError> {
        let mut session = self.take_session()?;
        let query = search_query(token);

        let (session, result) = task::spawn_blocking(move || {
            let result = session
                .search(&query)
                .map_err(|e| MailboxError::Search(format!("search failed: {e}")));
            (session, result)
        })
        .await
        .map_err(|e| MailboxError::Connection(format!("task join error: {e}")))?;

        self.session = Some(session);
        let matches = result?;

        // Ascending sequence order: the earliest match is fetched first
        let mut ids: Vec<u32> = matches.into_iter().collect();
        ids.sort_unstable();
        debug!(matches = ids.len(), "Search finished");
        Ok(ids)
    }

    async fn fetch_metadata(&mut self, id: u32) -> Result<MessageMeta, MailboxError> {
        let mut session = self.take_session()?;

        let (session, result) = task::spawn_blocking(move || {
            let result = session
                .fetch(id.to_string(), "(ENVELOPE INTERNALDATE)")
                .map_err(|e| MailboxError::Fetch(format!("fetch failed: {e}")))
                .and_then(|messages| {
                    let fetch = messages
                        .iter()
                        .next()
                        .ok_or_else(|| MailboxError::Fetch(format!("message {id} not found")))?;

                    let subject = fetch
                        .envelope()
                        .and_then(|env| env.subject.as_ref())
                        .map(|s| decode_subject(s));

                    let received_at = fetch
                        .internal_date()
                        .map(|d| d.with_timezone(&Utc))
                        .or_else(|| {
                            fetch
                                .envelope()
                                .and_then(|env| env.date.as_ref())
                                .and_then(|d| parse_header_date(d))
                        });

                    Ok(MessageMeta {
                        subject,
                        received_at,
                    })
                });
            (session, result)
        })
        .await
        .map_err(|e| MailboxError::Connection(format!("task join error: {e}")))?;

        self.session = Some(session);
        result
    }

    async fn close(&mut self) -> Result<(), MailboxError> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        task::spawn_blocking(move || {
            if let Err(e) = session.logout() {
                warn!(error = %e, "IMAP logout failed");
            }
        })
        .await
        .map_err(|e| MailboxError::Connection(format!("task join error: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_query_quotes_the_token() {
        assert_eq!(search_query("A1B2C3D4E5F6"), "TEXT \"A1B2C3D4E5F6\"");
    }

    #[test]
    fn subject_decoding_tolerates_invalid_utf8() {
        assert_eq!(decode_subject(b"Deliverability probe"), "Deliverability probe");
        let mangled = decode_subject(&[0x44, 0xFF, 0x45]);
        assert!(mangled.contains('D'));
        assert!(mangled.contains('E'));
    }

    #[test]
    fn header_date_parses_rfc2822() {
        let parsed = parse_header_date(b"Tue, 4 Aug 2026 10:15:00 +0200").unwrap();
        assert_eq!(parsed.timezone(), Utc);
        let rendered = parsed.to_rfc3339();
        assert!(rendered.starts_with("2026-08-04T08:15:00"));
    }

    #[test]
    fn header_date_rejects_garbage() {
        assert!(parse_header_date(b"not a date").is_none());
    }

    #[tokio::test]
    async fn closed_connection_rejects_operations() {
        let mut conn = ImapMailboxConnection { session: None };
        assert!(conn.open_folder("INBOX").await.is_err());
        assert!(conn.search_text("TOKEN").await.is_err());
        assert!(conn.fetch_metadata(1).await.is_err());
        // close is idempotent
        assert!(conn.close().await.is_ok());
    }
}
