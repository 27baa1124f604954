// Notifications written as JSON files, for pickup by a mail relay.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use fieldplan_analysis::{Message, Notifier, NotifyError};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    #[serde(rename = "replyTo")]
    pub reply_to: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct Outbox {
    dir: PathBuf,
    seq: u64,
}

impl Outbox {
    pub fn new(dir: PathBuf) -> Outbox {
        Outbox { dir, seq: 0 }
    }

    fn transport(message: &Message, e: impl ToString) -> NotifyError {
        NotifyError::Transport {
            subject: message.subject.clone(),
            message: e.to_string(),
        }
    }
}

impl Notifier for Outbox {
    fn send(&mut self, message: &Message) -> Result<(), NotifyError> {
        if message.recipients.is_empty() {
            return Err(NotifyError::NoRecipient {
                subject: message.subject.clone(),
            });
        }
        fs::create_dir_all(&self.dir).map_err(|e| Outbox::transport(message, e))?;
        let now = Utc::now();
        let om = OutboxMessage {
            recipients: message.recipients.clone(),
            subject: message.subject.clone(),
            body: message.body.clone(),
            reply_to: message.reply_to.clone(),
            created_at: now.to_rfc3339(),
        };
        let js = serde_json::to_string_pretty(&om).map_err(|e| Outbox::transport(message, e))?;
        self.seq += 1;
        let path = self.dir.join(format!(
            "{}-{:04}.json",
            now.format("%Y%m%dT%H%M%S%.3f"),
            self.seq
        ));
        fs::write(&path, js).map_err(|e| Outbox::transport(message, e))?;
        info!("send: {:?} queued at {:?}", message.subject, path);
        Ok(())
    }
}
