//! Transactional email through Brevo's SMTP API.
use checkout_engine::{
    notifications::Notification,
    traits::{EmailError, EmailSender},
};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    StatusCode,
};
use serde::Serialize;

use crate::{config::EmailConfig, errors::ServerError};

#[derive(Clone, Debug)]
pub struct BrevoSender {
    client: Client,
    config: EmailConfig,
}

#[derive(Debug, Serialize)]
struct Contact<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailPayload<'a> {
    sender: Contact<'a>,
    to: Vec<Contact<'a>>,
    subject: &'a str,
    html_content: &'a str,
}

impl BrevoSender {
    pub fn new(config: EmailConfig) -> Result<Self, ServerError> {
        let mut headers = HeaderMap::with_capacity(1);
        let mut key = HeaderValue::from_str(config.api_key.reveal())
            .map_err(|e| ServerError::ConfigurationError(format!("Invalid email API key. {e}")))?;
        key.set_sensitive(true);
        headers.insert("api-key", key);
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!("{}/v3/smtp/email", self.config.api_url)
    }

    fn payload<'a>(&'a self, notification: &'a Notification) -> EmailPayload<'a> {
        EmailPayload {
            sender: Contact { email: &self.config.sender_email, name: Some(&self.config.sender_name) },
            to: vec![Contact { email: &notification.recipient, name: notification.recipient_name.as_deref() }],
            subject: &notification.subject,
            html_content: &notification.body,
        }
    }
}

impl EmailSender for BrevoSender {
    async fn send(&self, notification: &Notification) -> Result<(), EmailError> {
        let response = self
            .client
            .post(self.url())
            .json(&self.payload(notification))
            .send()
            .await
            .map_err(|e| EmailError::Transient(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            trace!("📬️ Brevo accepted \"{}\" for {}", notification.subject, notification.recipient);
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify(status, &body))
    }
}

/// Rate limiting and server-side failures are worth retrying. Anything else means the message itself was rejected.
fn classify(status: StatusCode, body: &str) -> EmailError {
    let message = format!("{status}: {body}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        EmailError::Transient(message)
    } else {
        EmailError::Permanent(message)
    }
}
