use anyhow::Context;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use cvmon_common::Config;

use super::backend::NotifyBackend;
use crate::types::RenderedReport;

/// SMTP delivery over a STARTTLS relay with username/password auth.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
}

impl SmtpMailer {
    /// Build the transport and parse every address up front, so a bad
    /// address fails the run before any data is collected.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .with_context(|| format!("Invalid SMTP host '{}'", config.smtp_host))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: parse_mailbox("EMAIL_FROM", &config.email_from)?,
            to: parse_mailbox("EMAIL_TO", &config.email_to)?,
            cc: parse_mailboxes("EMAIL_CC", &config.email_cc)?,
            bcc: parse_mailboxes("EMAIL_BCC", &config.email_bcc)?,
        })
    }

    pub fn build_message(&self, report: &RenderedReport) -> anyhow::Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(report.subject.as_str());

        for mailbox in &self.cc {
            builder = builder.cc(mailbox.clone());
        }
        for mailbox in &self.bcc {
            builder = builder.bcc(mailbox.clone());
        }

        builder
            .header(ContentType::TEXT_HTML)
            .body(report.html.clone())
            .context("Failed to build report email")
    }
}

fn parse_mailbox(key: &str, raw: &str) -> anyhow::Result<Mailbox> {
    raw.trim()
        .parse::<Mailbox>()
        .with_context(|| format!("{key} is not a valid address: '{raw}'"))
}

fn parse_mailboxes(key: &str, raw: &[String]) -> anyhow::Result<Vec<Mailbox>> {
    raw.iter().map(|a| parse_mailbox(key, a)).collect()
}

#[async_trait]
impl NotifyBackend for SmtpMailer {
    async fn send_report(&self, report: &RenderedReport) -> anyhow::Result<()> {
        let message = self.build_message(report)?;

        match self.transport.send(message).await {
            Ok(response) => {
                info!(
                    subject = report.subject.as_str(),
                    recipients = self.recipient_count(),
                    code = %response.code(),
                    "Report email sent"
                );
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "SMTP delivery failed");
                Err(anyhow::Error::new(e).context("Failed to send report email"))
            }
        }
    }

    fn name(&self) -> &'static str {
        "smtp"
    }

    fn recipient_count(&self) -> usize {
        1 + self.cc.len() + self.bcc.len()
    }
}
