#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Mailing rendered reports to students.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    address::Envelope,
    message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::{config::SmtpEnv, error::MailError};

/// Body of every report mail.
const REPORT_MAIL_BODY: &str = "Hello,\n\nThis is an automatic message: the correction report \
                                for your submission is attached.\n\nPlease do not reply to this \
                                mail.\n";

/// Sends an assembled message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Delivers `message` from `from` to `to`.
    async fn send(&self, from: &str, to: &str, message: Message) -> Result<(), MailError>;
}

/// Parses `address` into a mail address.
fn parse_address(address: &str) -> Result<Address, MailError> {
    address
        .trim()
        .parse::<Address>()
        .map_err(|source| MailError::Address {
            address: address.to_string(),
            source,
        })
}

/// Builds the report mail for one student.
///
/// Each file in `attachments` is attached as `application/octet-stream`
/// under its own file name.
pub fn compose_report_mail(
    from: &str,
    to: &str,
    exercise: &str,
    attachments: &[PathBuf],
) -> Result<Message, MailError> {
    let from = Mailbox::new(None, parse_address(from)?);
    let to = Mailbox::new(None, parse_address(to)?);

    let mut body = MultiPart::mixed().singlepart(SinglePart::plain(REPORT_MAIL_BODY.to_string()));
    for path in attachments {
        body = body.singlepart(attachment_part(path)?);
    }

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(format!("Automatic correction {exercise}"))
        .multipart(body)?;
    Ok(message)
}

/// Reads `path` into an attachment part.
fn attachment_part(path: &Path) -> Result<SinglePart, MailError> {
    let bytes = std::fs::read(path).map_err(|source| MailError::Attachment {
        path: path.display().to_string(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.html".to_string());
    let content_type = ContentType::parse("application/octet-stream")
        .map_err(|e| MailError::Transport(e.to_string()))?;
    Ok(Attachment::new(name).body(bytes, content_type))
}

/// Async SMTP delivery through `lettre`.
pub struct SmtpTransport {
    /// Underlying connection pool.
    inner: AsyncSmtpTransport<Tokio1Executor>,
    /// Host, kept for logging.
    host:  String,
}

impl std::fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl SmtpTransport {
    /// Connects to the server described by `env`.
    ///
    /// With TLS on, the connection uses STARTTLS on the relay port; with it
    /// off, a plain connection is made, which is only sensible for a local
    /// relay.
    pub fn from_env(env: &SmtpEnv) -> Result<Self, MailError> {
        let mut builder = if env.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&env.host)
                .map_err(|e| MailError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&env.host)
        };
        if let Some(port) = env.port {
            builder = builder.port(port);
        }
        if let (Some(user), Some(password)) = (&env.username, &env.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            inner: builder.build(),
            host:  env.host.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, from: &str, to: &str, message: Message) -> Result<(), MailError> {
        let envelope = Envelope::new(Some(parse_address(from)?), vec![parse_address(to)?])
            .map_err(|e| MailError::Transport(e.to_string()))?;
        self.inner
            .send_raw(&envelope, &message.formatted())
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        tracing::debug!("Sent report mail to {to} through {}", self.host);
        Ok(())
    }
}
