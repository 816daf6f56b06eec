//! Request parameters and response envelopes for the iTelBilling API.
//!
//! Parameter structs serialize straight into the query string. Optional
//! fields are skipped when absent so the provider only sees what the caller
//! actually supplied.

use crate::error::InvalidParam;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Customer type of a client account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ClientType {
    Originating = 1,
    Terminating = 2,
    Both = 3,
    Reseller = 4,
}

impl TryFrom<u8> for ClientType {
    type Error = InvalidParam;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ClientType::Originating),
            2 => Ok(ClientType::Terminating),
            3 => Ok(ClientType::Both),
            4 => Ok(ClientType::Reseller),
            other => Err(InvalidParam::new("customerType", other)),
        }
    }
}

impl From<ClientType> for u8 {
    fn from(value: ClientType) -> Self {
        value as u8
    }
}

impl ClientType {
    /// Accepts the integers 1 through 4 only.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, InvalidParam> {
        value
            .as_u64()
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| InvalidParam::new("customerType", value))
            .and_then(ClientType::try_from)
    }
}

/// Recharge service type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ServiceType {
    Prepaid = 0,
    Postpaid = 1,
}

impl TryFrom<u8> for ServiceType {
    type Error = InvalidParam;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ServiceType::Prepaid),
            1 => Ok(ServiceType::Postpaid),
            other => Err(InvalidParam::new("serviceType", other)),
        }
    }
}

impl From<ServiceType> for u8 {
    fn from(value: ServiceType) -> Self {
        value as u8
    }
}

impl ServiceType {
    /// Accepts the integers 0 and 1 only.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, InvalidParam> {
        value
            .as_u64()
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| InvalidParam::new("serviceType", value))
            .and_then(ServiceType::try_from)
    }
}

/// A positive, finite recharge amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RechargeAmount(f64);

impl RechargeAmount {
    pub fn new(value: f64) -> Result<Self, InvalidParam> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(InvalidParam::new("rechargeAmount", value))
        }
    }

    /// Parse a numeric string such as `"10"` or `" 12.50 "`.
    pub fn parse(raw: &str) -> Result<Self, InvalidParam> {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| InvalidParam::new("rechargeAmount", raw))
            .and_then(Self::new)
    }

    /// Coerce a JSON number or numeric string.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, InvalidParam> {
        match value {
            serde_json::Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| InvalidParam::new("rechargeAmount", n))
                .and_then(Self::new),
            serde_json::Value::String(s) => Self::parse(s),
            other => Err(InvalidParam::new("rechargeAmount", other)),
        }
    }
}

impl fmt::Display for RechargeAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for RechargeAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parameters for `type=verify` on the PIN signup endpoint.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinVerifyParams {
    pub mobile_number: String,
    pub password: String,
    #[serde(rename = "callerIDs")]
    pub caller_ids: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "countryID", skip_serializing_if = "Option::is_none")]
    pub country_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_from: Option<String>,
    #[serde(rename = "ratePlanID", skip_serializing_if = "Option::is_none")]
    pub rate_plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(rename = "topUpRatePlanID", skip_serializing_if = "Option::is_none")]
    pub top_up_rate_plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "parentID", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Parameters for `type=signUp` on the PIN signup endpoint.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinSignUpParams {
    pub mobile_number: String,
    #[serde(rename = "pinbatchID", skip_serializing_if = "Option::is_none")]
    pub pinbatch_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dont_send_mail: Option<bool>,
}

/// Parameters for `type=verify` on the client signup endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientVerifyParams {
    pub username: String,
    pub customer_type: ClientType,
    pub password: String,
    /// `IP:PORT`, e.g. `165.32.23.23:5060`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(rename = "ratePlanID", skip_serializing_if = "Option::is_none")]
    pub rate_plan_id: Option<String>,
    #[serde(rename = "topUpRatePlanID", skip_serializing_if = "Option::is_none")]
    pub top_up_rate_plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_prefix: Option<String>,
    #[serde(rename = "orgPrefixRateID", skip_serializing_if = "Option::is_none")]
    pub org_prefix_rate_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ter_prefix: Option<String>,
    #[serde(rename = "terPrefixRateID", skip_serializing_if = "Option::is_none")]
    pub ter_prefix_rate_id: Option<String>,
    #[serde(rename = "callerIDs", skip_serializing_if = "Option::is_none")]
    pub caller_ids: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "countryID", skip_serializing_if = "Option::is_none")]
    pub country_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ClientVerifyParams {
    /// Required fields only; fill in the optional ones as needed.
    pub fn new(
        username: impl Into<String>,
        customer_type: ClientType,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            customer_type,
            password: password.into(),
            ip: None,
            balance: None,
            rate_plan_id: None,
            top_up_rate_plan_id: None,
            org_prefix: None,
            org_prefix_rate_id: None,
            ter_prefix: None,
            ter_prefix_rate_id: None,
            caller_ids: None,
            first_name: None,
            last_name: None,
            address: None,
            company_name: None,
            state: None,
            country_id: None,
            email_address: None,
            fax: None,
            mobile_number: None,
            info_from: None,
            currency: None,
            language: None,
        }
    }
}

/// Parameters for `type=signUp` on the client signup endpoint.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSignUpParams {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dont_send_mail: Option<bool>,
}

/// Parameters for `type=recharge`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUpParams {
    pub country_name: String,
    pub operator_name: String,
    pub service_type: ServiceType,
    pub mobile_number: String,
    pub recharge_amount: RechargeAmount,
}

/// PIN account credentials used to answer the recharge challenge.
#[derive(Clone)]
pub struct PinCredentials {
    /// The PIN issued at signup.
    pub user: String,
    /// The end user's plaintext password. Never sent as-is.
    pub password: String,
}

impl fmt::Debug for PinCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinCredentials")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Challenge fields appended to a PIN recharge.
#[derive(Debug, Serialize)]
pub(crate) struct PinChallenge<'a> {
    pub user: &'a str,
    pub nonce: &'a str,
    pub password: &'a str,
}

/// Generic provider envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// `"true"` or `"false"`.
    pub status: String,
    #[serde(default)]
    pub description: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status == "true"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TopUpResponse {
    #[serde(rename = "rechargeID")]
    pub recharge_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TopUpStatusResponse {
    pub status: i64,
}

impl TopUpStatusResponse {
    pub fn state(&self) -> TopUpStatus {
        TopUpStatus::from_code(self.status)
    }
}

/// Recharge progress as reported by the status call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopUpStatus {
    Pending,
    Completed,
    Failed,
    Processing,
    Unknown,
}

impl TopUpStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => TopUpStatus::Pending,
            1 => TopUpStatus::Completed,
            2 => TopUpStatus::Failed,
            3 => TopUpStatus::Processing,
            _ => TopUpStatus::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TopUpStatus::Pending => "Pending",
            TopUpStatus::Completed => "Completed",
            TopUpStatus::Failed => "Failed",
            TopUpStatus::Processing => "Processing",
            TopUpStatus::Unknown => "Unknown",
        }
    }
}

/// Either the expected body or a rejection envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Reply<T> {
    Envelope(ApiResponse),
    Body(T),
}
