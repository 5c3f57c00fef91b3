//! Outbound delivery of the rendered digest.
//!
//! Delivery is a narrow seam: the pipeline hands over a finished message
//! and gets back success or a `DigestError::Delivery`. Nothing is retried.

pub mod mail_api;

pub use mail_api::MailApiSink;

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// A finished message ready to send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
}

impl OutboundMessage {
    /// Build a message whose body is the document lines joined by newlines.
    pub fn new(from: &str, to: &[String], subject: String, lines: &[String]) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_vec(),
            subject,
            text: lines.join("\n"),
        }
    }
}

/// Sends a message somewhere.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Send one message. Exactly one attempt is made.
    async fn deliver(&self, message: &OutboundMessage) -> Result<()>;
}

/// Prints the message instead of sending it.
pub struct StdoutSink;

#[async_trait]
impl DeliverySink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn deliver(&self, message: &OutboundMessage) -> Result<()> {
        info!("Printing digest instead of mailing it");
        println!("To: {}", message.to.join(", "));
        println!("Subject: {}\n", message.subject);
        println!("{}", message.text);
        Ok(())
    }
}
