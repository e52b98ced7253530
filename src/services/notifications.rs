//! Notification service
//!
//! Renders the account emails and hands them to the configured sender.
//! Delivery is best effort: failures are logged and never reach the caller,
//! so the write that triggered the email always stands.

use std::sync::Arc;

use super::mailer::EmailSender;

#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn EmailSender>,
    base_url: String,
}

impl Notifier {
    pub fn new(sender: Arc<dyn EmailSender>, base_url: impl Into<String>) -> Self {
        Self {
            sender,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn deliver(&self, kind: &'static str, to: &str, subject: &str, body: String) {
        match self.sender.send_email(to, subject, &body).await {
            Ok(()) => tracing::info!(kind = kind, to = to, "Email sent"),
            Err(e) => tracing::warn!(kind = kind, to = to, error = %e, "Email delivery failed"),
        }
    }

    pub async fn send_verification(&self, to: &str, token: &str) {
        let link = format!("{}/auth/verify-email/{}", self.base_url, token);
        let body = format!(
            "<h2>Please verify your email</h2>\
             <p>Click the link below to verify your email address:</p>\
             <a href=\"{link}\">{link}</a>\
             <p>If you didn't create an account, please ignore this email.</p>"
        );
        self.deliver("verification", to, "Email Verification - TenderHub", body)
            .await;
    }

    pub async fn send_password_reset_code(&self, to: &str, code: &str, ttl_minutes: i64) {
        let body = format!(
            "<h2>Password Reset Request</h2>\
             <p>Your password reset code is:</p>\
             <p style=\"font-size:24px;letter-spacing:4px\"><strong>{code}</strong></p>\
             <p>This code expires in {ttl_minutes} minutes.</p>\
             <p>If you didn't request this, please ignore this email.</p>"
        );
        self.deliver("password_reset", to, "Password Reset - TenderHub", body)
            .await;
    }

    pub async fn send_documents_verified(&self, to: &str) {
        let body = "<h2>Documents verified</h2>\
             <p>Your documents have been approved. You can now post tenders and place bids.</p>"
            .to_string();
        self.deliver("documents_verified", to, "Documents Verified - TenderHub", body)
            .await;
    }

    pub async fn send_documents_rejected(&self, to: &str, reason: &str) {
        let body = format!(
            "<h2>Documents rejected</h2>\
             <p>Your documents could not be approved for the following reason:</p>\
             <blockquote>{reason}</blockquote>\
             <p>Please correct them and submit again.</p>"
        );
        self.deliver("documents_rejected", to, "Documents Rejected - TenderHub", body)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mailer::{EmailError, MockEmailSender};
    use mockall::predicate::*;

    #[tokio::test]
    async fn verification_link_uses_base_url() {
        let mut sender = MockEmailSender::new();
        sender
            .expect_send_email()
            .with(
                eq("new@example.com"),
                always(),
                function(|body: &str| body.contains("https://api.example.com/auth/verify-email/tok-1")),
            )
            .times(1)
            .returning(|_, _, _| Ok(()));

        let notifier = Notifier::new(Arc::new(sender), "https://api.example.com/");
        notifier.send_verification("new@example.com", "tok-1").await;
    }

    #[tokio::test]
    async fn delivery_failure_is_swallowed() {
        let mut sender = MockEmailSender::new();
        sender
            .expect_send_email()
            .times(1)
            .returning(|_, _, _| Err(EmailError::Transport("connection refused".into())));

        let notifier = Notifier::new(Arc::new(sender), "http://localhost");
        notifier.send_documents_rejected("user@example.com", "blurry scan").await;
    }
}
