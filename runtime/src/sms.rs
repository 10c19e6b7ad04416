//! SMS reminder channels.
//!
//! [`TwilioSmsChannel`] posts to Twilio's Messages API. [`LogOnlyChannel`]
//! is used when no provider is configured: it records the reminder in the
//! log and reports success so local runs behave like production.

use std::future::Future;
use std::pin::Pin;

use reqwest::Client;
use serde::Deserialize;

use pgpal_core::notification::{NotificationError, ReminderChannel};

use crate::retry::{RetryPolicy, retry_transient};

const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Credentials and sender details for Twilio.
#[derive(Clone, Debug)]
pub struct TwilioConfig {
    /// Account SID
    pub account_sid: String,
    /// Auth token
    pub auth_token: String,
    /// Sending number in E.164 form
    pub from_number: String,
    /// Prefix for recipients stored without one, such as `+91`
    pub default_country_code: String,
}

/// Twilio error body.
#[derive(Deserialize)]
struct TwilioError {
    message: String,
}

/// Sends reminders through Twilio.
pub struct TwilioSmsChannel {
    client: Client,
    config: TwilioConfig,
    base_url: String,
    retry: RetryPolicy,
}

impl TwilioSmsChannel {
    /// Create a channel against the public Twilio API.
    #[must_use]
    pub fn new(config: TwilioConfig) -> Self {
        Self::with_base_url(config, TWILIO_API_BASE)
    }

    /// Create a channel against another API root (for tests).
    #[must_use]
    pub fn with_base_url(config: TwilioConfig, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            config,
            base_url: base_url.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    async fn post_once(&self, to: &str, body: &str) -> Result<(), NotificationError> {
        let params = [
            ("To", to),
            ("From", self.config.from_number.as_str()),
            ("Body", body),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<TwilioError>(&text)
            .map(|err| err.message)
            .unwrap_or(text);
        Err(NotificationError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// Put a stored phone number into E.164 form.
///
/// # Errors
///
/// Returns [`NotificationError::InvalidRecipient`] if no digits remain.
pub fn normalize_recipient(phone: &str, country_code: &str) -> Result<String, NotificationError> {
    let trimmed = phone.trim();
    if let Some(rest) = trimmed.strip_prefix('+') {
        if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(trimmed.to_string());
        }
        return Err(NotificationError::InvalidRecipient(phone.to_string()));
    }

    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(NotificationError::InvalidRecipient(phone.to_string()));
    }
    Ok(format!("{country_code}{digits}"))
}

fn is_transient(err: &NotificationError) -> bool {
    match err {
        NotificationError::Transport(_) => true,
        NotificationError::Rejected { status, .. } => *status == 429 || *status >= 500,
        NotificationError::InvalidRecipient(_) => false,
    }
}

impl ReminderChannel for TwilioSmsChannel {
    fn send_reminder(
        &self,
        phone: &str,
        message: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>> {
        let recipient = normalize_recipient(phone, &self.config.default_country_code);
        let body = message.to_string();

        Box::pin(async move {
            let to = recipient?;
            retry_transient(self.retry, || self.post_once(&to, &body), is_transient).await?;
            tracing::debug!(to = %to, "Reminder SMS accepted");
            Ok(())
        })
    }
}

/// Logs reminders instead of sending them.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogOnlyChannel;

impl ReminderChannel for LogOnlyChannel {
    fn send_reminder(
        &self,
        phone: &str,
        message: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>> {
        tracing::info!(to = %phone, message = %message, "SMS provider not configured; reminder logged");
        Box::pin(async { Ok(()) })
    }
}
