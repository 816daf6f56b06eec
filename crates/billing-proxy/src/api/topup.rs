//! Mobile recharge handlers.

use super::types::{
    present, present_value, ApiEnvelope, RechargeData, RechargeStatusData, TopUpRequest,
};
use super::{invalid_body, AppState};
use crate::error::ProxyError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use itel_billing_client::{generate_nonce, PinCredentials, RechargeAmount, ServiceType, TopUpParams};
use tracing::info;

fn missing_fields() -> ProxyError {
    ProxyError::Validation("Missing required fields".to_string())
}

/// Validate the recharge fields shared by both top-up routes.
fn top_up_params(request: TopUpRequest) -> Result<TopUpParams, ProxyError> {
    let (
        Some(country_name),
        Some(operator_name),
        Some(service_type),
        Some(mobile_number),
        Some(recharge_amount),
    ) = (
        present(request.country_name),
        present(request.operator_name),
        present_value(request.service_type),
        present(request.mobile_number),
        present_value(request.recharge_amount),
    )
    else {
        return Err(missing_fields());
    };

    let service_type = ServiceType::from_json(&service_type).map_err(|_| {
        ProxyError::Validation("Service type must be 0 (prepaid) or 1 (postpaid)".to_string())
    })?;
    let recharge_amount = RechargeAmount::from_json(&recharge_amount).map_err(|_| {
        ProxyError::Validation("Recharge amount must be a positive number".to_string())
    })?;

    Ok(TopUpParams {
        country_name,
        operator_name,
        service_type,
        mobile_number,
        recharge_amount,
    })
}

/// Recharge on behalf of an IP client.
pub async fn top_up_ip_client(
    State(state): State<AppState>,
    payload: Result<Json<TopUpRequest>, JsonRejection>,
) -> Result<Json<ApiEnvelope<RechargeData>>, ProxyError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let params = top_up_params(request)?;
    info!(
        mobile_number = %params.mobile_number,
        amount = %params.recharge_amount,
        "IP client top-up request received"
    );

    let response = state
        .billing
        .top_up_for_ip_client(&params)
        .await
        .map_err(|e| state.billing_failure("ip client top-up", e))?;

    info!(recharge_id = response.recharge_id, "Top-up accepted");

    Ok(Json(ApiEnvelope::ok(
        "Top-up request successful",
        RechargeData {
            recharge_id: response.recharge_id,
        },
    )))
}

/// Recharge on behalf of a PIN user, answering the provider's challenge.
pub async fn top_up_pin_user(
    State(state): State<AppState>,
    payload: Result<Json<TopUpRequest>, JsonRejection>,
) -> Result<Json<ApiEnvelope<RechargeData>>, ProxyError> {
    let Json(mut request) = payload.map_err(invalid_body)?;

    let (Some(user), Some(password)) = (
        present(request.user.take()),
        present(request.password.take()),
    ) else {
        return Err(missing_fields());
    };
    let params = top_up_params(request)?;
    info!(
        mobile_number = %params.mobile_number,
        amount = %params.recharge_amount,
        "PIN user top-up request received"
    );

    if state.users.read().await.find_by_pin(&user).is_none() {
        return Err(ProxyError::NotFound("User not found".to_string()));
    }

    let credentials = PinCredentials { user, password };
    let nonce = generate_nonce();

    let response = state
        .billing
        .top_up_for_pin_user(&params, &credentials, &nonce)
        .await
        .map_err(|e| state.billing_failure("pin user top-up", e))?;

    info!(recharge_id = response.recharge_id, "Top-up accepted");

    Ok(Json(ApiEnvelope::ok(
        "Top-up request successful",
        RechargeData {
            recharge_id: response.recharge_id,
        },
    )))
}

/// Poll the state of a recharge.
pub async fn top_up_status(
    State(state): State<AppState>,
    Path(recharge_id): Path<String>,
) -> Result<Json<ApiEnvelope<RechargeStatusData>>, ProxyError> {
    let recharge_id: i64 = recharge_id
        .trim()
        .parse()
        .map_err(|_| ProxyError::Validation("Recharge ID must be an integer".to_string()))?;

    let response = state
        .billing
        .check_top_up_status(recharge_id)
        .await
        .map_err(|e| state.billing_failure("top-up status", e))?;

    Ok(Json(ApiEnvelope::ok(
        "Status retrieved successfully",
        RechargeStatusData {
            recharge_id,
            status: response.status,
            status_message: response.state().label(),
        },
    )))
}
