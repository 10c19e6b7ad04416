//! Twilio channel tests against a mock HTTP server.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pgpal_core::notification::{NotificationError, ReminderChannel};
use pgpal_runtime::retry::RetryPolicy;
use pgpal_runtime::sms::{TwilioConfig, TwilioSmsChannel};
use wiremock::matchers::{basic_auth, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MESSAGES_PATH: &str = "/2010-04-01/Accounts/AC123/Messages.json";

fn config() -> TwilioConfig {
    TwilioConfig {
        account_sid: "AC123".to_string(),
        auth_token: "secret".to_string(),
        from_number: "+15005550006".to_string(),
        default_country_code: "+91".to_string(),
    }
}

fn quick_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

#[tokio::test]
async fn posts_form_with_country_code_and_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .and(basic_auth("AC123", "secret"))
        .and(body_string_contains("To=%2B919876543210"))
        .and(body_string_contains("From=%2B15005550006"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "sid": "SM1",
            "status": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let channel = TwilioSmsChannel::with_base_url(config(), server.uri());
    let result = channel.send_reminder("9876543210", "Rent due").await;

    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": 21211,
            "message": "The 'To' number is not a valid phone number."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let channel = TwilioSmsChannel::with_base_url(config(), server.uri()).with_retry(quick_retry());
    let result = channel.send_reminder("9876543210", "Rent due").await;

    assert_eq!(
        result,
        Err(NotificationError::Rejected {
            status: 400,
            message: "The 'To' number is not a valid phone number.".to_string(),
        })
    );
}

#[tokio::test]
async fn server_errors_are_retried_until_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let channel = TwilioSmsChannel::with_base_url(config(), server.uri()).with_retry(quick_retry());
    let result = channel.send_reminder("9876543210", "Rent due").await;

    assert!(matches!(
        result,
        Err(NotificationError::Rejected { status: 503, .. })
    ));
}

#[tokio::test]
async fn invalid_recipient_never_reaches_the_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let channel = TwilioSmsChannel::with_base_url(config(), server.uri());
    let result = channel.send_reminder("n/a", "Rent due").await;

    assert!(matches!(result, Err(NotificationError::InvalidRecipient(_))));
}
