//! Template rendering for outbound email
//!
//! Uses the Tera engine with templates embedded at compile time. Currently
//! only the completion summary email is templated.

use application::ports::CompletionSummary;
use domain::entities::DeliveryStatus;
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

/// Error type for template operations
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template not found
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Template rendering failed
    #[error("Template rendering failed: {0}")]
    Render(String),

    /// Template compilation failed
    #[error("Template compilation failed: {0}")]
    Compile(String),
}

impl From<tera::Error> for TemplateError {
    fn from(e: tera::Error) -> Self {
        match e.kind {
            tera::ErrorKind::TemplateNotFound(name) => Self::NotFound(name),
            _ => Self::Render(e.to_string()),
        }
    }
}

/// Completion summary email, HTML body
const COMPLETION_EMAIL_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body { font-family: Arial, sans-serif; color: #333; }
        .container { max-width: 600px; margin: 0 auto; padding: 20px; }
        .header { background: #4F46E5; color: white; padding: 20px; text-align: center; }
        .content { padding: 20px; background: #f9f9f9; }
        .result-item { padding: 10px; margin: 5px 0; background: white; border-radius: 5px; }
        .inbox { border-left: 4px solid #10B981; }
        .spam { border-left: 4px solid #EF4444; }
        .error { border-left: 4px solid #6B7280; }
        .not-delivered { border-left: 4px solid #F59E0B; }
        .score { font-size: 24px; font-weight: bold; color: #4F46E5; text-align: center; margin: 20px 0; }
        .button { display: inline-block; padding: 12px 24px; background: #4F46E5; color: white; text-decoration: none; border-radius: 5px; }
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>Email Deliverability Report Ready</h1>
        </div>
        <div class="content">
            <p>Hello {{ user_name }},</p>
            <p>Your email deliverability test has been completed. Here's a quick summary:</p>

            <div class="score">Deliverability Score: {{ score }}%</div>

            <h3>Detailed Results:</h3>
            {% for outcome in outcomes %}
            <div class="result-item {{ outcome.css_class }}">
                <strong>{{ outcome.provider | upper }}:</strong> {{ outcome.address }}<br>
                {{ outcome.status_line }}
                {% if outcome.error %}<br><small>Error: {{ outcome.error }}</small>{% endif %}
            </div>
            {% endfor %}

            <p><strong>Summary:</strong> {{ counts.inbox }} inbox, {{ counts.spam }} spam,
               {{ counts.errors }} errors, {{ counts.not_delivered }} not delivered</p>

            {% if report_link %}
            <p style="text-align: center; margin: 30px 0;">
                <a href="{{ report_link }}" class="button" style="color:white">View Full Report</a>
            </p>
            {% endif %}

            <p>Thank you for using InboxSight!</p>
        </div>
    </div>
</body>
</html>
"#;

/// One rendered result row
#[derive(Debug, Serialize)]
struct OutcomeRow {
    provider: String,
    address: String,
    status_line: String,
    css_class: String,
    error: Option<String>,
}

impl OutcomeRow {
    fn from_summary(summary: &CompletionSummary) -> Vec<Self> {
        summary
            .outcomes
            .iter()
            .map(|o| {
                let status_line = match o.status {
                    DeliveryStatus::Delivered => format!("Delivered ({})", o.folder.label()),
                    DeliveryStatus::Error => "Error".to_string(),
                    _ => "Not Delivered".to_string(),
                };
                let css_class = match o.status {
                    DeliveryStatus::Delivered
                        if o.folder == domain::value_objects::FolderCategory::Inbox =>
                    {
                        "inbox".to_string()
                    },
                    DeliveryStatus::Delivered
                        if o.folder == domain::value_objects::FolderCategory::Spam =>
                    {
                        "spam".to_string()
                    },
                    DeliveryStatus::Error => "error".to_string(),
                    _ => "not-delivered".to_string(),
                };
                Self {
                    provider: o.provider.to_string(),
                    address: o.email_address.to_string(),
                    status_line,
                    css_class,
                    error: o.error.clone(),
                }
            })
            .collect()
    }
}

/// Template engine with embedded templates
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Compile the embedded templates
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_template("email/completion.html", COMPLETION_EMAIL_HTML)
            .map_err(|e| TemplateError::Compile(e.to_string()))?;
        Ok(Self { tera })
    }

    /// Render the completion summary email HTML
    pub fn render_completion_email(
        &self,
        summary: &CompletionSummary,
    ) -> Result<String, TemplateError> {
        let mut context = Context::new();
        context.insert(
            "user_name",
            summary.user_name.as_deref().unwrap_or("there"),
        );
        context.insert("score", &summary.score);
        context.insert("counts", &summary.counts);
        context.insert("outcomes", &OutcomeRow::from_summary(summary));
        context.insert("report_link", &summary.report_link);

        Ok(self.tera.render("email/completion.html", &context)?)
    }
}
