//! iTelBilling HTTP client.

use crate::digest::challenge_digest;
use crate::error::BillingError;
use crate::types::*;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const PIN_SIGNUP_PATH: &str = "/api/signupPin.jsp";
const CLIENT_SIGNUP_PATH: &str = "/api/signupClient.jsp";
const TOP_UP_PATH: &str = "/api/mtuApi.jsp";

/// Default timeout for a single provider call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`BillingClient`].
#[derive(Debug, Clone)]
pub struct BillingClientConfig {
    pub base_url: String,
    /// Source address whitelisted on the provider side, if known.
    pub allowed_ip: Option<String>,
    pub timeout: Duration,
}

impl BillingClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            allowed_ip: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// iTelBilling client.
///
/// Every call is a POST with an empty body; parameters travel in the query
/// string with a `type` discriminator. Calls are never retried.
#[derive(Clone)]
pub struct BillingClient {
    client: Client,
    base_url: String,
    allowed_ip: Option<String>,
}

impl BillingClient {
    /// Create a new billing client.
    pub fn new(config: BillingClientConfig) -> Result<Self, BillingError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            allowed_ip: config.allowed_ip,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn allowed_ip(&self) -> Option<&str> {
        self.allowed_ip.as_deref()
    }

    /// Verify a prospective PIN user (`type=verify`).
    #[instrument(skip(self, params), fields(mobile_number = %params.mobile_number))]
    pub async fn verify_pin_user(
        &self,
        params: &PinVerifyParams,
    ) -> Result<ApiResponse, BillingError> {
        let request = self.request(PIN_SIGNUP_PATH, "verify").query(params);
        let body = self.send(request, BodyLog::Logged).await?;
        parse_envelope(&body)
    }

    /// Complete PIN signup (`type=signUp`). On success the description is the issued PIN.
    #[instrument(skip(self, params), fields(mobile_number = %params.mobile_number))]
    pub async fn sign_up_pin_user(
        &self,
        params: &PinSignUpParams,
    ) -> Result<ApiResponse, BillingError> {
        let request = self.request(PIN_SIGNUP_PATH, "signUp").query(params);
        // The description carries the issued PIN.
        let body = self.send(request, BodyLog::Redacted).await?;
        parse_envelope(&body)
    }

    /// Verify a prospective client account (`type=verify`).
    #[instrument(skip(self, params), fields(username = %params.username))]
    pub async fn verify_client(
        &self,
        params: &ClientVerifyParams,
    ) -> Result<ApiResponse, BillingError> {
        let request = self.request(CLIENT_SIGNUP_PATH, "verify").query(params);
        let body = self.send(request, BodyLog::Logged).await?;
        parse_envelope(&body)
    }

    /// Complete client signup (`type=signUp`).
    #[instrument(skip(self, params), fields(username = %params.username))]
    pub async fn sign_up_client(
        &self,
        params: &ClientSignUpParams,
    ) -> Result<ApiResponse, BillingError> {
        let request = self.request(CLIENT_SIGNUP_PATH, "signUp").query(params);
        let body = self.send(request, BodyLog::Logged).await?;
        parse_envelope(&body)
    }

    /// Recharge a mobile number on behalf of an IP client.
    #[instrument(skip(self, params), fields(mobile_number = %params.mobile_number))]
    pub async fn top_up_for_ip_client(
        &self,
        params: &TopUpParams,
    ) -> Result<TopUpResponse, BillingError> {
        let request = self.request(TOP_UP_PATH, "recharge").query(params);
        let body = self.send(request, BodyLog::Logged).await?;
        parse_reply(&body)
    }

    /// Recharge a mobile number on behalf of a PIN user.
    ///
    /// The plaintext password is replaced by `MD5(nonce || user || password)`.
    #[instrument(skip(self, params, credentials, nonce), fields(mobile_number = %params.mobile_number, user = %credentials.user))]
    pub async fn top_up_for_pin_user(
        &self,
        params: &TopUpParams,
        credentials: &PinCredentials,
        nonce: &str,
    ) -> Result<TopUpResponse, BillingError> {
        let digest = challenge_digest(nonce, &credentials.user, &credentials.password);
        let challenge = PinChallenge {
            user: &credentials.user,
            nonce,
            password: &digest,
        };

        let request = self
            .request(TOP_UP_PATH, "recharge")
            .query(params)
            .query(&challenge);
        let body = self.send(request, BodyLog::Logged).await?;
        parse_reply(&body)
    }

    /// Poll the state of a recharge.
    #[instrument(skip(self))]
    pub async fn check_top_up_status(
        &self,
        recharge_id: i64,
    ) -> Result<TopUpStatusResponse, BillingError> {
        let request = self
            .request(TOP_UP_PATH, "status")
            .query(&[("verificationCode", recharge_id)]);
        let body = self.send(request, BodyLog::Logged).await?;
        parse_reply(&body)
    }

    fn request(&self, path: &str, operation: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .query(&[("type", operation)])
    }

    async fn send(&self, request: RequestBuilder, logging: BodyLog) -> Result<String, BillingError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, body = %body, "iTelBilling request failed");
            return Err(BillingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Response body: {}", logging.preview(&body));
        Ok(body)
    }
}

/// Whether a successful response body may appear in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyLog {
    Logged,
    Redacted,
}

impl BodyLog {
    const PREVIEW_CHARS: usize = 200;

    fn preview(self, body: &str) -> String {
        match self {
            BodyLog::Logged => body.chars().take(Self::PREVIEW_CHARS).collect(),
            BodyLog::Redacted => format!("<{} bytes redacted>", body.len()),
        }
    }
}

fn parse_envelope(body: &str) -> Result<ApiResponse, BillingError> {
    serde_json::from_str(body).map_err(|e| BillingError::Decode(format!("{}: {}", e, body)))
}

fn parse_reply<T: DeserializeOwned>(body: &str) -> Result<T, BillingError> {
    let reply: Reply<T> =
        serde_json::from_str(body).map_err(|e| BillingError::Decode(format!("{}: {}", e, body)))?;

    match reply {
        Reply::Body(value) => Ok(value),
        Reply::Envelope(envelope) if !envelope.is_success() => {
            Err(BillingError::Rejected(envelope))
        }
        Reply::Envelope(envelope) => Err(BillingError::Decode(format!(
            "expected a result body, got envelope: {}",
            envelope.description
        ))),
    }
}
