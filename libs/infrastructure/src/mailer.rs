use async_trait::async_trait;
use chipper_core::contracts::NotificationPayload;
use chipper_core::error::ChipperError;
use chipper_core::traits::NotificationChannel;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// A rendered mail message, independent of the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    /// Renders the per-follower notification payload into mail copy.
    pub fn from_payload(payload: &NotificationPayload, base_url: &str) -> Self {
        let subject = format!(
            "{} just posted: {}",
            payload.author_name, payload.post_title
        );

        let body = format!(
            "Hey {},\n\n\
             {} just published a new post on Chipper.\n\n\
             {}\n\
             {}\n\n\
             View post: {}/posts/{}\n\n\
             Stay tuned for more updates from your favorites!",
            payload.follower_name,
            payload.author_name,
            payload.post_title,
            payload.post_summary,
            base_url,
            payload.post_id,
        );

        Self {
            to: payload.follower_email.clone(),
            subject,
            body,
        }
    }
}

/// Delivers follower notifications by POSTing rendered mail to an HTTP
/// delivery endpoint (a transactional mail relay).
pub struct WebhookMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    base_url: String,
}

impl WebhookMailer {
    pub fn new(
        endpoint: String,
        api_key: String,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self, ChipperError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ChipperError::Infrastructure {
                reason: format!("Failed to build mail client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookMailer {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), ChipperError> {
        let message = MailMessage::from_payload(payload, &self.base_url);

        let mut request = self.client.post(&self.endpoint).json(&message);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| ChipperError::Delivery {
            recipient: payload.follower_id.clone(),
            source: anyhow::Error::from(e),
        })?;

        if !response.status().is_success() {
            return Err(ChipperError::Delivery {
                recipient: payload.follower_id.clone(),
                source: anyhow::anyhow!("delivery endpoint returned {}", response.status()),
            });
        }

        info!(
            "📫 Mail handed off for {} ({})",
            payload.follower_id, message.subject
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> NotificationPayload {
        NotificationPayload {
            follower_id: "follower-1".to_string(),
            follower_name: "Ada".to_string(),
            follower_email: "ada@example.com".to_string(),
            author_name: "Grace".to_string(),
            post_id: "post-9".to_string(),
            post_title: "On Compilers".to_string(),
            post_summary: "A short summary.".to_string(),
        }
    }

    #[test]
    fn test_mail_addressed_to_follower() {
        let mail = MailMessage::from_payload(&sample_payload(), "http://localhost:3000");
        assert_eq!(mail.to, "ada@example.com");
    }

    #[test]
    fn test_mail_subject_names_author_and_title() {
        let mail = MailMessage::from_payload(&sample_payload(), "http://localhost:3000");
        assert_eq!(mail.subject, "Grace just posted: On Compilers");
    }

    #[test]
    fn test_mail_body_carries_greeting_summary_and_link() {
        let mail = MailMessage::from_payload(&sample_payload(), "https://chipper.example");
        assert!(mail.body.starts_with("Hey Ada,"));
        assert!(mail.body.contains("A short summary."));
        assert!(mail.body.contains("View post: https://chipper.example/posts/post-9"));
    }
}
