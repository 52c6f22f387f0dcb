//! SMTP client for completion notifications
//!
//! A lightweight async SMTP implementation over tokio and tokio-native-tls.
//! Supports implicit TLS (port 465) and STARTTLS, with PLAIN authentication.

use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
};
use tokio_native_tls::TlsConnector;
use tracing::{debug, error, instrument, trace};

use crate::{MailError, MailTlsConfig, build_tls_connector};

/// SMTP relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP server host
    pub host: String,
    /// SMTP port (465 implicit TLS, 587 STARTTLS)
    pub port: u16,
    /// Login user and From address
    pub user: String,
    /// Password or app password
    pub password: String,
    /// Display name on the From header
    pub from_name: Option<String>,
    /// TLS settings
    pub tls: MailTlsConfig,
}

impl SmtpConfig {
    /// Validate that the transport can be used
    pub fn validate(&self) -> Result<(), MailError> {
        if self.host.is_empty() {
            return Err(MailError::InvalidConfig("smtp host is empty".to_string()));
        }
        if self.user.is_empty() || self.password.is_empty() {
            return Err(MailError::InvalidConfig(
                "smtp credentials are not configured".to_string(),
            ));
        }
        Ok(())
    }
}

/// An outgoing message
#[derive(Debug, Clone)]
pub struct MailMessage {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub text_body: String,
    /// Optional HTML alternative
    pub html_body: Option<String>,
}

/// SMTP client for sending notification emails
#[derive(Debug, Clone)]
pub struct SmtpClient {
    config: SmtpConfig,
}

impl SmtpClient {
    /// Creates a new SMTP client with the given configuration
    pub const fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Sends a message, returning its Message-ID
    #[instrument(skip(self, message), fields(to = %message.to))]
    pub async fn send(&self, message: &MailMessage) -> Result<String, MailError> {
        self.config.validate()?;
        debug!(subject = %message.subject, "Sending email");

        let message_id = format!(
            "<{}.{}@{}>",
            chrono::Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4(),
            extract_domain(&self.config.user)
        );

        let content = build_content(&self.config, message, &message_id);
        self.send_smtp(&message.to, &content).await?;

        debug!(message_id = %message_id, "Email sent successfully");
        Ok(message_id)
    }

    async fn send_smtp(&self, to: &str, content: &str) -> Result<(), MailError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let stream = TcpStream::connect(&addr).await.map_err(|e| {
            error!(error = %e, "Failed to connect to SMTP server");
            MailError::ConnectionFailed(format!("SMTP connection failed: {e}"))
        })?;

        let tls = TlsConnector::from(build_tls_connector(&self.config.tls)?);

        if self.config.port == 465 {
            // Implicit TLS
            let tls_stream = tls
                .connect(&self.config.host, stream)
                .await
                .map_err(|e| MailError::ConnectionFailed(format!("TLS handshake failed: {e}")))?;
            self.session(tls_stream, to, content, true).await
        } else {
            self.starttls_session(stream, to, content, &tls).await
        }
    }

    async fn starttls_session(
        &self,
        stream: TcpStream,
        to: &str,
        content: &str,
        tls: &TlsConnector,
    ) -> Result<(), MailError> {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        // Greeting, EHLO, STARTTLS on the plain stream
        read_response(&mut reader).await?;
        send_command(&mut writer, &format!("EHLO {}", ehlo_hostname())).await?;
        read_response(&mut reader).await?;

        send_command(&mut writer, "STARTTLS").await?;
        expect_response(&mut reader, "220").await?;

        let stream = reader.into_inner().unsplit(writer);
        let tls_stream = tls
            .connect(&self.config.host, stream)
            .await
            .map_err(|e| MailError::ConnectionFailed(format!("STARTTLS upgrade failed: {e}")))?;

        self.session(tls_stream, to, content, false).await
    }

    async fn session<S>(
        &self,
        stream: S,
        to: &str,
        content: &str,
        expect_greeting: bool,
    ) -> Result<(), MailError>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        // Implicit TLS starts with a greeting; after STARTTLS the upgraded
        // stream continues straight at EHLO.
        if expect_greeting {
            read_response(&mut reader).await?;
        }

        send_command(&mut writer, &format!("EHLO {}", ehlo_hostname())).await?;
        read_response(&mut reader).await?;

        // AUTH PLAIN
        let auth_string = format!("\0{}\0{}", self.config.user, self.config.password);
        let auth_b64 = base64::engine::general_purpose::STANDARD.encode(auth_string);
        send_command(&mut writer, &format!("AUTH PLAIN {auth_b64}")).await?;
        let auth_response = read_response(&mut reader).await?;
        if !auth_response.starts_with("235") {
            return Err(MailError::AuthenticationFailed);
        }

        send_command(&mut writer, &format!("MAIL FROM:<{}>", self.config.user)).await?;
        expect_response(&mut reader, "250").await?;

        send_command(&mut writer, &format!("RCPT TO:<{to}>")).await?;
        expect_response(&mut reader, "250").await?;

        send_command(&mut writer, "DATA").await?;
        expect_response(&mut reader, "354").await?;

        // Escape leading dots per RFC 5321 transparency
        let escaped = escape_leading_dots(content);
        writer
            .write_all(escaped.as_bytes())
            .await
            .map_err(|e| MailError::SmtpError(format!("Failed to send content: {e}")))?;
        writer
            .write_all(b"\r\n.\r\n")
            .await
            .map_err(|e| MailError::SmtpError(format!("Failed to end DATA: {e}")))?;
        writer.flush().await.ok();

        expect_response(&mut reader, "250").await?;

        send_command(&mut writer, "QUIT").await?;
        // Don't wait for the QUIT response, the server may close first

        Ok(())
    }
}

/// EHLO hostname, falling back to localhost
fn ehlo_hostname() -> String {
    hostname::get().map_or_else(
        |_| "localhost".to_string(),
        |h| h.to_string_lossy().to_string(),
    )
}

/// Extracts the domain of an email address, for Message-ID generation
fn extract_domain(email: &str) -> &str {
    email.split('@').nth(1).unwrap_or("localhost")
}

/// Escapes dots that start a line (RFC 5321 §4.5.2)
fn escape_leading_dots(content: &str) -> String {
    let escaped = content.replace("\r\n.", "\r\n..");
    if let Some(rest) = escaped.strip_prefix('.') {
        format!(".{rest}")
    } else {
        escaped
    }
}

/// Builds the RFC 5322 message, multipart/alternative when HTML is present
fn build_content(config: &SmtpConfig, message: &MailMessage, message_id: &str) -> String {
    let date = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S +0000");
    let from = config.from_name.as_ref().map_or_else(
        || config.user.clone(),
        |name| format!("\"{name}\" <{}>", config.user),
    );

    let mut headers = format!(
        "From: {from}\r\n\
         To: {}\r\n\
         Subject: {}\r\n\
         Date: {date}\r\n\
         Message-ID: {message_id}\r\n\
         MIME-Version: 1.0\r\n",
        message.to, message.subject
    );

    match &message.html_body {
        None => {
            headers.push_str(
                "Content-Type: text/plain; charset=utf-8\r\n\
                 Content-Transfer-Encoding: 8bit\r\n",
            );
            format!("{headers}\r\n{}", message.text_body)
        },
        Some(html) => {
            let boundary = format!("=_inboxsight_{}", uuid::Uuid::new_v4().simple());
            headers.push_str(&format!(
                "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n"
            ));
            format!(
                "{headers}\r\n\
                 --{boundary}\r\n\
                 Content-Type: text/plain; charset=utf-8\r\n\
                 Content-Transfer-Encoding: 8bit\r\n\
                 \r\n\
                 {}\r\n\
                 --{boundary}\r\n\
                 Content-Type: text/html; charset=utf-8\r\n\
                 Content-Transfer-Encoding: 8bit\r\n\
                 \r\n\
                 {html}\r\n\
                 --{boundary}--\r\n",
                message.text_body
            )
        },
    }
}

/// Sends an SMTP command line
async fn send_command<W>(writer: &mut W, command: &str) -> Result<(), MailError>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    trace!(command = %command.split(' ').next().unwrap_or(command), "Sending SMTP command");
    writer
        .write_all(format!("{command}\r\n").as_bytes())
        .await
        .map_err(|e| MailError::SmtpError(format!("Failed to send command: {e}")))?;
    writer.flush().await.ok();
    Ok(())
}

/// Reads one possibly multi-line SMTP response
async fn read_response<R>(reader: &mut BufReader<R>) -> Result<String, MailError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut response = String::new();
    loop {
        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| MailError::SmtpError(format!("Failed to read response: {e}")))?;
        if read == 0 {
            return Err(MailError::SmtpError(
                "connection closed mid-response".to_string(),
            ));
        }

        trace!(line = %line.trim(), "SMTP response");
        response.push_str(&line);

        // Last line has a space (not a hyphen) after the code
        if line.len() >= 4 && line.chars().nth(3) != Some('-') {
            break;
        }
    }
    Ok(response)
}

/// Expects a specific response code
async fn expect_response<R>(reader: &mut BufReader<R>, expected_code: &str) -> Result<(), MailError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let response = read_response(reader).await?;
    if !response.starts_with(expected_code) {
        return Err(MailError::SmtpError(format!(
            "Expected {expected_code}, got: {response}"
        )));
    }
    Ok(())
}
