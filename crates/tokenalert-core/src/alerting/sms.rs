//! SMS delivery through Azure Communication Services
//!
//! Requests are authenticated with the HMAC-SHA256 scheme derived from the
//! resource connection string (`endpoint=https://...;accesskey=...`).

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use super::router::{MessageSender, NotificationError};
use crate::config::SmsConfig;
use crate::error::{Error, Result};

const SMS_API_PATH: &str = "sms?api-version=2021-03-07";
const SIGNED_HEADERS: &str = "x-ms-date;host;x-ms-content-sha256";

/// Endpoint and key parsed from a connection string
#[derive(Debug, Clone)]
struct AcsCredentials {
    endpoint: Url,
    access_key: Vec<u8>,
}

impl AcsCredentials {
    fn parse(connection_string: &str) -> std::result::Result<Self, NotificationError> {
        let mut endpoint = None;
        let mut access_key = None;

        for part in connection_string.split(';').filter(|p| !p.trim().is_empty()) {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim().to_string()),
                "accesskey" => access_key = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let endpoint = endpoint.ok_or_else(|| {
            NotificationError::ConfigError("connection string has no endpoint".into())
        })?;
        let access_key = access_key.ok_or_else(|| {
            NotificationError::ConfigError("connection string has no accesskey".into())
        })?;

        let mut endpoint = Url::parse(&endpoint).map_err(|e| {
            NotificationError::ConfigError(format!("invalid endpoint '{endpoint}': {e}"))
        })?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        let access_key = STANDARD
            .decode(access_key)
            .map_err(|e| NotificationError::ConfigError(format!("accesskey is not base64: {e}")))?;

        Ok(Self { endpoint, access_key })
    }
}

/// Sends text messages from a configured number
pub struct SmsSender {
    client: Client,
    credentials: Option<AcsCredentials>,
    from: String,
}

impl SmsSender {
    /// Create a sender; unconfigured credentials turn every send into a no-op
    pub fn new(config: &SmsConfig) -> Result<Self> {
        let credentials = if config.is_configured() {
            let parsed = AcsCredentials::parse(&config.connection_string)
                .map_err(|e| Error::config(format!("WCS_CONNECTION_STRING: {e}")))?;
            Some(parsed)
        } else {
            None
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
            from: config.phone_number.clone(),
        })
    }

    /// Whether credentials were configured
    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }
}

#[async_trait]
impl MessageSender for SmsSender {
    /// Text messages carry only the subject line.
    async fn send(
        &self,
        to: &str,
        subject: &str,
        _body: &str,
    ) -> std::result::Result<(), NotificationError> {
        let Some(credentials) = &self.credentials else {
            debug!(to, "SMS not configured, skipping");
            return Ok(());
        };

        let url = credentials
            .endpoint
            .join(SMS_API_PATH)
            .map_err(|e| NotificationError::ConfigError(e.to_string()))?;

        let payload = SmsRequest {
            from: self.from.clone(),
            sms_recipients: vec![SmsRecipient { to: to.to_string() }],
            message: subject.to_string(),
            sms_send_options: SmsSendOptions {
                enable_delivery_report: false,
            },
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|e| NotificationError::Message(e.to_string()))?;

        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let content_hash = STANDARD.encode(Sha256::digest(&body));
        let host = host_header(&url);
        let path_and_query = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        let signature = sign(
            &credentials.access_key,
            "POST",
            &path_and_query,
            &date,
            &host,
            &content_hash,
        )?;

        let response = self
            .client
            .post(url)
            .header("x-ms-date", &date)
            .header("x-ms-content-sha256", &content_hash)
            .header(
                "Authorization",
                format!("HMAC-SHA256 SignedHeaders={SIGNED_HEADERS}&Signature={signature}"),
            )
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| NotificationError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::HttpError(format!(
                "SMS service returned {}: {}",
                status, body
            )));
        }

        // A 202 can still carry per-recipient rejections
        if let Ok(parsed) = response.json::<SmsResponse>().await {
            if let Some(rejected) = parsed.value.into_iter().find(|r| !r.successful) {
                return Err(NotificationError::HttpError(format!(
                    "SMS to {} rejected: {}",
                    rejected.to,
                    rejected.error_message.unwrap_or_else(|| "unknown error".to_string())
                )));
            }
        }

        info!(to, "SMS accepted");
        Ok(())
    }
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// HMAC-SHA256 signature over the method, path, date, host and content hash.
fn sign(
    key: &[u8],
    method: &str,
    path_and_query: &str,
    date: &str,
    host: &str,
    content_hash: &str,
) -> std::result::Result<String, NotificationError> {
    let string_to_sign = format!("{method}\n{path_and_query}\n{date};{host};{content_hash}");

    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| NotificationError::ConfigError(e.to_string()))?;
    Mac::update(&mut mac, string_to_sign.as_bytes());

    Ok(STANDARD.encode(Mac::finalize(mac).into_bytes()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SmsRequest {
    from: String,
    sms_recipients: Vec<SmsRecipient>,
    message: String,
    sms_send_options: SmsSendOptions,
}

#[derive(Debug, Serialize)]
struct SmsRecipient {
    to: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SmsSendOptions {
    enable_delivery_report: bool,
}

#[derive(Debug, Deserialize)]
struct SmsResponse {
    #[serde(default)]
    value: Vec<SmsSendResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmsSendResult {
    to: String,
    successful: bool,
    error_message: Option<String>,
}
