//! API request and response types.

use crate::store::{BillingState, Role, UserRecord};
use itel_billing_client::ClientType;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Accept a string, number or boolean and keep it as text.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, got {}",
            other
        ))),
    }
}

/// Treat blank strings as absent.
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Treat JSON null as absent.
pub(crate) fn present_value(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}

/// Success envelope: `{"status": "true", "message": ..., "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T> {
    pub status: &'static str,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiEnvelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "true",
            message: message.into(),
            data,
        }
    }
}

/// Request to register a local user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_number: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterData {
    pub id: Uuid,
}

/// Request to log in.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Profile fields safe to return to the caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub country: String,
    pub role: Role,
    pub billing_verified: bool,
    pub billing_signed_up: bool,
    pub billing_state: BillingState,
    #[serde(rename = "billingPIN", skip_serializing_if = "Option::is_none")]
    pub billing_pin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_mobile_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_client_type: Option<ClientType>,
}

impl From<&UserRecord> for UserSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            country: user.country.clone(),
            role: user.role,
            billing_verified: user.billing_verified,
            billing_signed_up: user.billing_signed_up,
            billing_state: user.billing_state(),
            billing_pin: user.billing_pin.clone(),
            billing_mobile_number: user.billing_mobile_number.clone(),
            billing_client_type: user.billing_client_type,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginData {
    pub token: String,
    pub user: UserSummary,
}

/// Step one of the PIN flow.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinVerifyRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub mobile_number: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "callerIDs", default, deserialize_with = "lenient_string")]
    pub caller_ids: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "countryID", default, deserialize_with = "lenient_string")]
    pub country_id: Option<String>,
    #[serde(rename = "ratePlanID", default, deserialize_with = "lenient_string")]
    pub rate_plan_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub balance: Option<String>,
    #[serde(rename = "topUpRatePlanID", default, deserialize_with = "lenient_string")]
    pub top_up_rate_plan_id: Option<String>,
    pub address: Option<String>,
    pub company_name: Option<String>,
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fax: Option<String>,
    pub info_from: Option<String>,
    pub currency: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "parentID", default, deserialize_with = "lenient_string")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinVerifyData {
    pub mobile_number: String,
}

/// Step two of the PIN flow.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinSignUpRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub mobile_number: Option<String>,
    #[serde(rename = "pinbatchID", default, deserialize_with = "lenient_string")]
    pub pinbatch_id: Option<String>,
    pub dont_send_mail: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinSignUpData {
    pub pin: String,
    pub mobile_number: String,
}

/// Step one of the client flow.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientVerifyRequest {
    pub username: Option<String>,
    pub customer_type: Option<Value>,
    pub password: Option<String>,
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub balance: Option<String>,
    #[serde(rename = "ratePlanID", default, deserialize_with = "lenient_string")]
    pub rate_plan_id: Option<String>,
    #[serde(rename = "topUpRatePlanID", default, deserialize_with = "lenient_string")]
    pub top_up_rate_plan_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub org_prefix: Option<String>,
    #[serde(rename = "orgPrefixRateID", default, deserialize_with = "lenient_string")]
    pub org_prefix_rate_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ter_prefix: Option<String>,
    #[serde(rename = "terPrefixRateID", default, deserialize_with = "lenient_string")]
    pub ter_prefix_rate_id: Option<String>,
    #[serde(rename = "callerIDs", default, deserialize_with = "lenient_string")]
    pub caller_ids: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub company_name: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "countryID", default, deserialize_with = "lenient_string")]
    pub country_id: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fax: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mobile_number: Option<String>,
    pub info_from: Option<String>,
    pub currency: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientVerifyData {
    pub client_type: String,
}

/// Step two of the client flow.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSignUpRequest {
    pub username: Option<String>,
    pub dont_send_mail: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ClientSignUpData {
    pub username: String,
}

/// Recharge request for either an IP client or a PIN user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUpRequest {
    pub country_name: Option<String>,
    pub operator_name: Option<String>,
    pub service_type: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mobile_number: Option<String>,
    pub recharge_amount: Option<Value>,
    /// PIN (PIN users only)
    #[serde(default, deserialize_with = "lenient_string")]
    pub user: Option<String>,
    /// End user's password (PIN users only)
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RechargeData {
    #[serde(rename = "rechargeID")]
    pub recharge_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeStatusData {
    #[serde(rename = "rechargeID")]
    pub recharge_id: i64,
    pub status: i64,
    pub status_message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_fields_accepted_as_text() {
        let request: PinVerifyRequest = serde_json::from_value(json!({
            "mobileNumber": 15551234567u64,
            "password": "pw",
            "callerIDs": "15551234567",
            "countryID": 18,
            "balance": 2.5
        }))
        .unwrap();

        assert_eq!(request.mobile_number.as_deref(), Some("15551234567"));
        assert_eq!(request.country_id.as_deref(), Some("18"));
        assert_eq!(request.balance.as_deref(), Some("2.5"));
        assert!(request.parent_id.is_none());
    }

    #[test]
    fn test_structured_values_rejected() {
        let result = serde_json::from_value::<PinSignUpRequest>(json!({
            "mobileNumber": ["1", "2"]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_present_filters_blank() {
        assert_eq!(present(Some("  ".into())), None);
        assert_eq!(present(Some("x".into())), Some("x".into()));
        assert_eq!(present_value(Some(Value::Null)), None);
        assert_eq!(present_value(Some(json!(0))), Some(json!(0)));
    }

    #[test]
    fn test_summary_never_includes_password_hash() {
        let user = UserRecord::new(
            "alice".into(),
            "alice@example.com".into(),
            "pw",
            "15550000001".into(),
            "US".into(),
        );
        let json = serde_json::to_value(UserSummary::from(&user)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
        assert!(!json.to_string().contains(&user.password_hash));
        assert!(json.get("billingPIN").is_none());
        assert_eq!(json["billingVerified"], false);
        assert_eq!(json["billingState"], "absent");
    }

    #[test]
    fn test_summary_reports_billing_state() {
        let mut user = UserRecord::new(
            "15550000001".into(),
            "15550000001@temp.com".into(),
            "pw",
            "15550000001".into(),
            "unknown".into(),
        );
        user.mark_pin_verified("15550000001".into());
        assert_eq!(
            serde_json::to_value(UserSummary::from(&user)).unwrap()["billingState"],
            "verified"
        );

        user.mark_pin_signed_up("889900".into());
        let json = serde_json::to_value(UserSummary::from(&user)).unwrap();
        assert_eq!(json["billingState"], "signed-up");
        assert_eq!(json["billingPIN"], "889900");
    }

    #[test]
    fn test_status_data_field_names() {
        let json = serde_json::to_value(RechargeStatusData {
            recharge_id: 5,
            status: 1,
            status_message: "Completed",
        })
        .unwrap();
        assert_eq!(json, json!({"rechargeID": 5, "status": 1, "statusMessage": "Completed"}));
    }
}
