// ********* Notifications ***********

use std::thread;
use std::time::Duration;

use log::{debug, warn};
use snafu::Snafu;

use crate::config::{AnalysisConfig, RunMode};

/// Structured content of an email. Transport details belong to the notifier.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Message {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub reply_to: String,
}

impl Message {
    /// A message to the recipients of the current mode. Test messages are tagged in the
    /// subject and carry a banner.
    pub fn compose(config: &AnalysisConfig, subject: &str, body: &str) -> Message {
        let body = match config.mode {
            RunMode::Production => body.to_string(),
            RunMode::Test => format!(
                "<div style=\"background-color: #ffffcc; padding: 10px; border: 2px solid #ffcc00; margin-bottom: 20px;\"><strong>TEST MODE EMAIL</strong> - This is a test email sent only to {}</div>\n{}",
                config.active_recipients().join(", "),
                body
            ),
        };
        Message {
            recipients: config.active_recipients(),
            subject: config.subject(subject),
            body,
            reply_to: config.reply_to.clone(),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum NotifyError {
    #[snafu(display("Message {subject:?} has no recipient"))]
    NoRecipient { subject: String },
    #[snafu(display("Could not send {subject:?}: {message}"))]
    Transport { subject: String, message: String },
    #[snafu(display("Could not send {subject:?} after {attempts} attempts: {source}"))]
    RetriesExhausted {
        subject: String,
        attempts: u32,
        source: Box<NotifyError>,
    },
}

pub trait Notifier {
    fn send(&mut self, message: &Message) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for &mut N {
    fn send(&mut self, message: &Message) -> Result<(), NotifyError> {
        (**self).send(message)
    }
}

/// Retries a failed send a fixed number of times with a fixed delay.
pub struct RetryingNotifier<N> {
    inner: N,
    attempts: u32,
    delay: Duration,
}

impl<N: Notifier> RetryingNotifier<N> {
    pub fn new(inner: N, attempts: u32, delay: Duration) -> RetryingNotifier<N> {
        RetryingNotifier {
            inner,
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn into_inner(self) -> N {
        self.inner
    }
}

impl<N: Notifier> Notifier for RetryingNotifier<N> {
    fn send(&mut self, message: &Message) -> Result<(), NotifyError> {
        let mut attempt = 1;
        loop {
            match self.inner.send(message) {
                Ok(()) => {
                    debug!("send: {:?} sent on attempt {}", message.subject, attempt);
                    return Ok(());
                }
                Err(e @ NotifyError::NoRecipient { .. }) => return Err(e),
                Err(e) if attempt >= self.attempts => {
                    return Err(NotifyError::RetriesExhausted {
                        subject: message.subject.clone(),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!(
                        "send: attempt {} of {} failed: {}",
                        attempt, self.attempts, e
                    );
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// Keeps every message it receives. Fails the first `failures` sends.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub sent: Vec<Message>,
    pub failures: u32,
    pub attempts: u32,
}

impl RecordingNotifier {
    pub fn new() -> RecordingNotifier {
        RecordingNotifier::default()
    }

    pub fn failing(failures: u32) -> RecordingNotifier {
        RecordingNotifier {
            failures,
            ..RecordingNotifier::default()
        }
    }

    pub fn subjects(&self) -> Vec<&str> {
        self.sent.iter().map(|m| m.subject.as_str()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&mut self, message: &Message) -> Result<(), NotifyError> {
        self.attempts += 1;
        if message.recipients.is_empty() {
            return NoRecipientSnafu {
                subject: message.subject.clone(),
            }
            .fail();
        }
        if self.failures > 0 {
            self.failures -= 1;
            return TransportSnafu {
                subject: message.subject.clone(),
                message: "simulated outage",
            }
            .fail();
        }
        self.sent.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        Message {
            recipients: vec!["datateam@example.org".to_string()],
            subject: "Budget Analysis: Acme Org".to_string(),
            body: "<p>hello</p>".to_string(),
            reply_to: "datateam@example.org".to_string(),
        }
    }

    #[test]
    fn compose_follows_mode() {
        let config = AnalysisConfig {
            recipients: vec!["a@x.org".to_string()],
            test_recipients: vec!["t@x.org".to_string()],
            ..AnalysisConfig::default()
        };
        let m = Message::compose(&config, "Missing Budget: Acme Org", "<p>body</p>");
        assert_eq!(m.recipients, vec!["a@x.org"]);
        assert_eq!(m.subject, "Missing Budget: Acme Org");
        assert_eq!(m.body, "<p>body</p>");

        let config = AnalysisConfig {
            mode: RunMode::Test,
            ..config
        };
        let m = Message::compose(&config, "Missing Budget: Acme Org", "<p>body</p>");
        assert_eq!(m.recipients, vec!["t@x.org"]);
        assert_eq!(m.subject, "[TEST] Missing Budget: Acme Org");
        assert!(m.body.contains("TEST MODE EMAIL"));
        assert!(m.body.ends_with("<p>body</p>"));
    }

    #[test]
    fn retries_then_succeeds() {
        let mut n = RetryingNotifier::new(RecordingNotifier::failing(2), 3, Duration::ZERO);
        assert!(n.send(&message()).is_ok());
        let inner = n.into_inner();
        assert_eq!(inner.attempts, 3);
        assert_eq!(inner.sent.len(), 1);
    }

    #[test]
    fn gives_up_after_attempts() {
        let mut n = RetryingNotifier::new(RecordingNotifier::failing(5), 3, Duration::ZERO);
        let res = n.send(&message());
        assert!(matches!(
            res,
            Err(NotifyError::RetriesExhausted { attempts: 3, .. })
        ));
        let inner = n.into_inner();
        assert_eq!(inner.attempts, 3);
        assert!(inner.sent.is_empty());
    }

    #[test]
    fn no_recipient_is_not_retried() {
        let mut n = RetryingNotifier::new(RecordingNotifier::new(), 3, Duration::ZERO);
        let m = Message {
            recipients: vec![],
            ..message()
        };
        assert!(matches!(n.send(&m), Err(NotifyError::NoRecipient { .. })));
        assert_eq!(n.into_inner().attempts, 1);
    }
}
