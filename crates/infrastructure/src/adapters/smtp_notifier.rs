//! SMTP completion notifier
//!
//! Implements the notifier port by rendering the completion summary into a
//! text + HTML email and sending it through the SMTP client. Strictly
//! best-effort from the engine's point of view: errors surface to the
//! caller, which logs and swallows them.

use application::ports::{CompletionSummary, NotifierError, NotifierPort};
use async_trait::async_trait;
use domain::entities::DeliveryStatus;
use integration_mail::{MailMessage, SmtpClient, SmtpConfig};
use tracing::{debug, instrument};

use crate::templates::TemplateEngine;

/// Notifier adapter over the SMTP client
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    client: SmtpClient,
    templates: TemplateEngine,
}

impl SmtpNotifier {
    /// Create a notifier over an SMTP configuration
    pub fn new(config: SmtpConfig) -> Result<Self, NotifierError> {
        config
            .validate()
            .map_err(|e| NotifierError::NotConfigured(e.to_string()))?;
        let templates = TemplateEngine::new()
            .map_err(|e| NotifierError::NotConfigured(format!("template engine: {e}")))?;
        Ok(Self {
            client: SmtpClient::new(config),
            templates,
        })
    }

    fn subject(summary: &CompletionSummary) -> String {
        format!(
            "Your Email Deliverability Report - Score: {}%",
            summary.score
        )
    }

    fn text_body(summary: &CompletionSummary) -> String {
        let mut body = format!(
            "Hello {},\n\nYour email deliverability test is complete.\nScore: {}%\n\n",
            summary.user_name.as_deref().unwrap_or("there"),
            summary.score
        );

        for outcome in &summary.outcomes {
            let line = match outcome.status {
                DeliveryStatus::Delivered => {
                    format!("delivered ({})", outcome.folder.label().to_lowercase())
                },
                DeliveryStatus::Error => format!(
                    "error{}",
                    outcome
                        .error
                        .as_deref()
                        .map(|e| format!(": {e}"))
                        .unwrap_or_default()
                ),
                _ => "not delivered".to_string(),
            };
            body.push_str(&format!(
                "- {} ({}): {line}\n",
                outcome.email_address, outcome.provider
            ));
        }

        body.push_str(&format!(
            "\n{} inbox, {} spam, {} errors, {} not delivered\n",
            summary.counts.inbox,
            summary.counts.spam,
            summary.counts.errors,
            summary.counts.not_delivered
        ));

        if let Some(link) = &summary.report_link {
            body.push_str(&format!("\nView the full report: {link}\n"));
        }

        body
    }
}

#[async_trait]
impl NotifierPort for SmtpNotifier {
    #[instrument(skip(self, summary), fields(recipient = %summary.recipient, score = summary.score))]
    async fn send_completion_summary(
        &self,
        summary: &CompletionSummary,
    ) -> Result<(), NotifierError> {
        let html = self
            .templates
            .render_completion_email(summary)
            .map_err(|e| NotifierError::Send(format!("render failed: {e}")))?;

        let message = MailMessage {
            to: summary.recipient.to_string(),
            subject: Self::subject(summary),
            text_body: Self::text_body(summary),
            html_body: Some(html),
        };

        let message_id = self
            .client
            .send(&message)
            .await
            .map_err(|e| NotifierError::Send(e.to_string()))?;

        debug!(message_id = %message_id, "Completion summary sent");
        Ok(())
    }
}
