use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::AppConfig;

const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Checks a reCAPTCHA response token submitted with a form.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// Whether forms should render the widget.
    fn enabled(&self) -> bool;

    async fn verify(&self, response: &str, remote_ip: IpAddr) -> bool;
}

/// Installed when reCAPTCHA is switched off: every submission passes.
pub struct DisabledCaptcha;

#[async_trait]
impl CaptchaVerifier for DisabledCaptcha {
    fn enabled(&self) -> bool {
        false
    }

    async fn verify(&self, _response: &str, _remote_ip: IpAddr) -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

/// reCAPTCHA v2 verification against Google's `siteverify` endpoint.
pub struct GoogleRecaptcha {
    client: reqwest::Client,
    secret: String,
}

impl GoogleRecaptcha {
    pub fn new(secret: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, secret })
    }
}

#[async_trait]
impl CaptchaVerifier for GoogleRecaptcha {
    fn enabled(&self) -> bool {
        true
    }

    async fn verify(&self, response: &str, remote_ip: IpAddr) -> bool {
        if response.is_empty() {
            return false;
        }
        let ip = remote_ip.to_string();
        let params = [
            ("secret", self.secret.as_str()),
            ("response", response),
            ("remoteip", ip.as_str()),
        ];
        let reply = match self.client.post(SITEVERIFY_URL).form(&params).send().await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("reCAPTCHA request failed: {e}");
                return false;
            }
        };
        match reply.json::<SiteVerifyResponse>().await {
            Ok(body) => {
                if !body.success && !body.error_codes.is_empty() {
                    log::warn!("reCAPTCHA rejected: {}", body.error_codes.join(", "));
                }
                body.success
            }
            Err(e) => {
                log::warn!("reCAPTCHA response unreadable: {e}");
                false
            }
        }
    }
}

/// Pick the verifier for this configuration. Falls back to the disabled
/// verifier (with an error log) if the HTTP client cannot be built.
pub fn from_config(config: &AppConfig) -> Arc<dyn CaptchaVerifier> {
    if !config.recaptcha_enabled {
        return Arc::new(DisabledCaptcha);
    }
    if config.recaptcha_secret_key.is_empty() {
        log::warn!("ENABLE_RECAPTCHA is set but RECAPTCHA_SECRET_KEY is empty; every captcha will fail");
    }
    match GoogleRecaptcha::new(config.recaptcha_secret_key.clone()) {
        Ok(v) => Arc::new(v),
        Err(e) => {
            log::error!("Could not build reCAPTCHA client, disabling verification: {e}");
            Arc::new(DisabledCaptcha)
        }
    }
}
