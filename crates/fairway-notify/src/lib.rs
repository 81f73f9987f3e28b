// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! E-mail delivery of terminal booking outcomes.
//!
//! The notifier is deliberately optional: when SMTP settings are absent the
//! daemon still runs, and each would-be notification is logged and skipped.

use async_trait::async_trait;
use fairway_core::{FairwayError, Notification, NotificationKind, Notifier};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

/// Settings required to actually send mail.
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from: String,
    pub to: String,
}

struct Transport {
    smtp: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

/// SMTP [`Notifier`]. Built without settings it becomes a no-op that warns
/// on every skipped notification.
pub struct EmailNotifier {
    transport: Option<Transport>,
}

fn notify_err(message: &str, e: impl std::error::Error + Send + Sync + 'static) -> FairwayError {
    FairwayError::Notify {
        message: message.to_string(),
        source: Some(Box::new(e)),
    }
}

impl EmailNotifier {
    pub fn new(settings: Option<EmailSettings>) -> Result<Self, FairwayError> {
        let Some(settings) = settings else {
            return Ok(Self { transport: None });
        };

        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|e| notify_err("invalid from address", e))?;
        let to: Mailbox = settings
            .to
            .parse()
            .map_err(|e| notify_err("invalid to address", e))?;
        let smtp = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
            .map_err(|e| notify_err("invalid SMTP relay", e))?
            .credentials(Credentials::new(
                settings.smtp_username,
                settings.smtp_password,
            ))
            .build();

        Ok(Self {
            transport: Some(Transport { smtp, from, to }),
        })
    }
}

/// Subject and plain-text body for a terminal outcome.
fn compose(notification: &Notification) -> (String, String) {
    let date = notification.requested_date.format("%Y-%m-%d");
    let time = notification.requested_time.format("%I:%M %p");
    match &notification.kind {
        NotificationKind::Success { booked_slot } => (
            format!("Booking Successful - {date}"),
            format!(
                "Booked tee time for {} on {date} at {} (requested {time}, {} attempt(s)).",
                notification.requester,
                booked_slot.format("%I:%M %p"),
                notification.attempt_count,
            ),
        ),
        NotificationKind::Failure { reason } => (
            format!("Booking Failed - {date}"),
            format!(
                "Failed to book tee time for {} on {date} at {time} after {} attempt(s).\nError: {reason}",
                notification.requester, notification.attempt_count,
            ),
        ),
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), FairwayError> {
        let Some(transport) = &self.transport else {
            warn!(
                request = %notification.public_id,
                "SMTP not configured, skipping notification"
            );
            return Ok(());
        };

        let (subject, body) = compose(notification);
        let message = Message::builder()
            .from(transport.from.clone())
            .to(transport.to.clone())
            .subject(subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| notify_err("failed to build message", e))?;

        transport
            .smtp
            .send(message)
            .await
            .map_err(|e| notify_err("failed to send mail", e))?;

        info!(request = %notification.public_id, subject = %subject, "notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;

    use super::*;

    fn notification(kind: NotificationKind) -> Notification {
        Notification {
            public_id: Uuid::new_v4(),
            requester: "casey".to_string(),
            requested_date: NaiveDate::from_ymd_opt(2026, 9, 18).unwrap(),
            requested_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            attempt_count: 2,
            kind,
        }
    }

    #[tokio::test]
    async fn unconfigured_notifier_skips_without_error() {
        let notifier = EmailNotifier::new(None).unwrap();
        let n = notification(NotificationKind::Failure {
            reason: "site down".to_string(),
        });
        notifier.notify(&n).await.unwrap();
    }

    #[test]
    fn invalid_addresses_are_rejected_at_construction() {
        let settings = EmailSettings {
            smtp_host: "smtp.example.com".to_string(),
            smtp_username: "user".to_string(),
            smtp_password: "pass".to_string(),
            from: "not an address".to_string(),
            to: "golfer@example.com".to_string(),
        };
        assert!(EmailNotifier::new(Some(settings)).is_err());
    }

    #[test]
    fn success_message_names_the_booked_slot() {
        let (subject, body) = compose(&notification(NotificationKind::Success {
            booked_slot: NaiveTime::from_hms_opt(8, 10, 0).unwrap(),
        }));
        assert_eq!(subject, "Booking Successful - 2026-09-18");
        assert!(body.contains("casey"));
        assert!(body.contains("08:10 AM"));
        assert!(body.contains("2 attempt(s)"));
    }

    #[test]
    fn failure_message_carries_the_reason() {
        let (subject, body) = compose(&notification(NotificationKind::Failure {
            reason: "gave up after 5 attempts: site down".to_string(),
        }));
        assert_eq!(subject, "Booking Failed - 2026-09-18");
        assert!(body.contains("Error: gave up after 5 attempts: site down"));
        assert!(body.contains("08:00 AM"));
    }
}
