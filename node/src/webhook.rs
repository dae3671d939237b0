// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Signed upload of export documents to a mirror webhook.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;

use crate::errors::{EngineError, Result};

pub const NAME_HEADER: &str = "x-mirror-name";
pub const SIGNATURE_HEADER: &str = "x-mirror-sig";

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| EngineError::config(format!("webhook secret: {}", e)))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub struct WebhookClient {
    url: String,
    secret: String,
    client: Client,
}

impl WebhookClient {
    /// Both the endpoint and the secret are required; an unset one is a
    /// configuration error rather than a silent skip.
    pub fn new(url: Option<&str>, secret: Option<&str>, timeout: Duration) -> Result<Self> {
        let url = url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| EngineError::config("MIRROR_URL is not set"))?;
        let secret = secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EngineError::config("MIRROR_KEY is not set"))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::config(format!("http client: {}", e)))?;
        Ok(Self {
            url: url.to_string(),
            secret: secret.to_string(),
            client,
        })
    }

    /// POSTs `{name, exportedAt, data}` and returns the response body.
    pub async fn upload(&self, name: &str, data: &serde_json::Value) -> Result<String> {
        let envelope = serde_json::json!({
            "name": name,
            "exportedAt": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "data": data,
        });
        let body = serde_json::to_vec(&envelope).map_err(std::io::Error::from)?;
        let signature = sign(self.secret.as_bytes(), &body)?;

        let resp = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .header(NAME_HEADER, name)
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .map_err(|e| EngineError::Webhook {
                status: 0,
                body: e.to_string(),
            })?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            tracing::error!(name, status = status.as_u16(), "Webhook rejected upload");
            return Err(EngineError::Webhook {
                status: status.as_u16(),
                body: text,
            });
        }
        tracing::info!(name, status = status.as_u16(), "Uploaded");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_lowercase_hex_sha256() {
        // RFC 4231 test case 2.
        let sig = sign(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn missing_secret_is_a_configuration_error() {
        let err = WebhookClient::new(Some("http://127.0.0.1:1"), None, Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(err.is_fatal());
        let err = WebhookClient::new(None, Some("k"), Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
