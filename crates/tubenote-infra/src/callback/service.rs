//! Outcome callback delivery.
//!
//! When an async request supplies a callback URL, the terminal outcome is
//! POSTed to it exactly once. Delivery is best-effort: there is no retry
//! queue, and a failed POST is logged, not resurfaced. Payloads are signed
//! with HMAC-SHA256 when a signing secret is configured so receivers can
//! authenticate them.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use tubenote_core::models::RequestOutcome;

use super::ssrf::validate_callback_url;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct CallbackSenderConfig {
    pub timeout_seconds: u64,
    pub signing_secret: Option<String>,
    /// Permit callbacks to private/loopback hosts. Test and on-prem use
    /// only; defaults off.
    pub allow_private_hosts: bool,
}

impl Default for CallbackSenderConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            signing_secret: None,
            allow_private_hosts: false,
        }
    }
}

pub struct CallbackSender {
    http: Client,
    config: CallbackSenderConfig,
}

impl CallbackSender {
    pub fn new(config: CallbackSenderConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(4)
            .build()
            .context("failed to create HTTP client for callbacks")?;
        Ok(Self { http, config })
    }

    /// POST the outcome to the callback URL. One attempt, 2xx is success.
    #[tracing::instrument(skip(self, outcome))]
    pub async fn deliver(
        &self,
        url: &str,
        request_id: Uuid,
        outcome: &RequestOutcome,
    ) -> Result<()> {
        validate_callback_url(url, self.config.allow_private_hosts)
            .await
            .map_err(|e| anyhow!("invalid callback URL: {e}"))?;

        let body = serde_json::to_string(&json!({
            "request_id": request_id,
            "outcome": outcome,
        }))
        .context("failed to serialize callback payload")?;

        let mut request = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .header("User-Agent", "Tubenote-Callback/1.0");

        if let Some(secret) = &self.config.signing_secret {
            let signature = sign_payload(&body, secret)?;
            request = request.header("X-Callback-Signature", format!("v1={signature}"));
        }

        let response = request
            .body(body)
            .send()
            .await
            .context("callback request failed")?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(status = status.as_u16(), "callback delivered");
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(anyhow!(
                "callback returned non-2xx status {status}: {}",
                detail.chars().take(200).collect::<String>()
            ))
        }
    }

    /// Verify a signature produced by [`sign_payload`]; for receivers and
    /// tests.
    pub fn verify_signature(&self, body: &str, signature: &str) -> Result<bool> {
        let secret = self
            .config
            .signing_secret
            .as_deref()
            .ok_or_else(|| anyhow!("no signing secret configured"))?;
        Ok(sign_payload(body, secret)? == signature)
    }
}

fn sign_payload(body: &str, secret: &str) -> Result<String> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).context("invalid signing secret")?;
    mac.update(body.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_roundtrip() {
        let sender = CallbackSender::new(CallbackSenderConfig {
            signing_secret: Some("topsecret".to_string()),
            ..Default::default()
        })
        .unwrap();

        let body = r#"{"request_id":"x","outcome":{}}"#;
        let signature = sign_payload(body, "topsecret").unwrap();
        assert!(sender.verify_signature(body, &signature).unwrap());
        assert!(!sender.verify_signature("tampered", &signature).unwrap());
    }

    #[test]
    fn signatures_differ_per_secret() {
        let body = "payload";
        assert_ne!(
            sign_payload(body, "secret-a").unwrap(),
            sign_payload(body, "secret-b").unwrap()
        );
    }

    #[tokio::test]
    async fn private_callback_targets_are_rejected_by_default() {
        let sender = CallbackSender::new(CallbackSenderConfig::default()).unwrap();
        let outcome = RequestOutcome::Failure {
            stage: tubenote_core::models::Stage::Summarization,
            kind: "summarizer_error".to_string(),
            message: "x".to_string(),
        };
        let err = sender
            .deliver("http://127.0.0.1:9/cb", Uuid::new_v4(), &outcome)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid callback URL"));
    }
}
