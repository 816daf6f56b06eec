//! Local accounts and the provider verify/signup flows.

use super::types::{
    present, present_value, ApiEnvelope, ClientSignUpData, ClientSignUpRequest, ClientVerifyData,
    ClientVerifyRequest, LoginData, LoginRequest, PinSignUpData, PinSignUpRequest, PinVerifyData,
    PinVerifyRequest, RegisterData, RegisterRequest, UserSummary,
};
use super::{invalid_body, AppState};
use crate::error::ProxyError;
use crate::store::{UserDirectory, UserRecord};
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use itel_billing_client::{
    ClientSignUpParams, ClientType, ClientVerifyParams, PinSignUpParams, PinVerifyParams,
};
use tracing::{info, warn};

type Created<T> = (StatusCode, Json<ApiEnvelope<T>>);

const UNKNOWN_COUNTRY: &str = "unknown";

fn placeholder_email(local_part: &str) -> String {
    format!("{}@temp.com", local_part)
}

/// A lazily created record must not share an email or phone with anyone.
fn ensure_unclaimed(users: &UserDirectory, candidate: &UserRecord) -> Result<(), ProxyError> {
    if users.exists_with_email_or_phone(&candidate.email, &candidate.phone_number) {
        warn!(
            email = %candidate.email,
            phone_number = %candidate.phone_number,
            "Verify would duplicate an existing user"
        );
        return Err(ProxyError::Conflict("User already exists".to_string()));
    }
    Ok(())
}

/// Register a local user.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Created<RegisterData>, ProxyError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let (Some(username), Some(email), Some(password), Some(phone_number), Some(country)) = (
        present(request.username),
        present(request.email),
        present(request.password),
        present(request.phone_number),
        present(request.country),
    ) else {
        return Err(ProxyError::Validation("Missing required fields".to_string()));
    };

    info!(email = %email, "Registration request received");

    // Hash outside the lock.
    let record = UserRecord::new(username, email, &password, phone_number, country);
    let id = record.id;

    state
        .commit(|users| {
            if users.exists_with_email_or_phone(&record.email, &record.phone_number) {
                warn!(email = %record.email, "Attempted registration of existing user");
                return Err(ProxyError::Conflict("User already exists".to_string()));
            }
            users.insert(record);
            Ok(())
        })
        .await?;

    info!(user_id = %id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::ok("User registered successfully", RegisterData { id })),
    ))
}

/// Log in with email and password.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiEnvelope<LoginData>>, ProxyError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let (Some(email), Some(password)) = (present(request.email), present(request.password)) else {
        return Err(ProxyError::Validation(
            "Email and password are required".to_string(),
        ));
    };

    let user = state.users.read().await.find_by_email(&email).cloned();
    let Some(user) = user else {
        return Err(ProxyError::Unauthorized);
    };
    if !user.check_password(&password) {
        warn!(user_id = %user.id, "Login failed");
        return Err(ProxyError::Unauthorized);
    }

    let token = state.tokens.issue(&user)?;
    info!(user_id = %user.id, "Login successful");

    Ok(Json(ApiEnvelope::ok(
        "Login successful",
        LoginData {
            token,
            user: UserSummary::from(&user),
        },
    )))
}

/// Verify a prospective PIN user with the provider.
pub async fn verify_pin_user(
    State(state): State<AppState>,
    payload: Result<Json<PinVerifyRequest>, JsonRejection>,
) -> Result<Json<ApiEnvelope<PinVerifyData>>, ProxyError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let (Some(mobile_number), Some(password), Some(caller_ids)) = (
        present(request.mobile_number),
        present(request.password),
        present(request.caller_ids),
    ) else {
        return Err(ProxyError::Validation(
            "Missing required fields: mobileNumber, password, callerIDs".to_string(),
        ));
    };
    info!(mobile_number = %mobile_number, "PIN verify request received");

    let email = present(request.email);
    let candidate = UserRecord::new(
        mobile_number.clone(),
        email
            .clone()
            .unwrap_or_else(|| placeholder_email(&mobile_number)),
        &password,
        mobile_number.clone(),
        present(request.country_id.clone()).unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
    );

    {
        let users = state.users.read().await;
        match users.find_by_phone(&mobile_number) {
            Some(existing) if existing.billing_verified => {
                warn!(mobile_number = %mobile_number, "PIN user already verified");
                return Err(ProxyError::Conflict("User already verified".to_string()));
            }
            Some(_) => {}
            None => ensure_unclaimed(&users, &candidate)?,
        }
    }

    let params = PinVerifyParams {
        mobile_number: mobile_number.clone(),
        password: password.clone(),
        caller_ids,
        first_name: request.first_name,
        last_name: request.last_name,
        address: request.address,
        company_name: request.company_name,
        state: request.state,
        country_id: request.country_id,
        email_address: email,
        fax: request.fax,
        info_from: request.info_from,
        rate_plan_id: request.rate_plan_id,
        balance: request.balance,
        top_up_rate_plan_id: request.top_up_rate_plan_id,
        currency: request.currency,
        language: request.language,
        parent_id: request.parent_id,
    };

    let response = state
        .billing
        .verify_pin_user(&params)
        .await
        .map_err(|e| state.billing_failure("pin verify", e))?;
    if !response.is_success() {
        return Err(state.rejected("pin verify", &response.description));
    }

    state
        .commit(|users| {
            match users.find_by_phone_mut(&mobile_number) {
                Some(existing) => existing.mark_pin_verified(mobile_number.clone()),
                None => {
                    ensure_unclaimed(users, &candidate)?;
                    let mut record = candidate;
                    record.mark_pin_verified(mobile_number.clone());
                    users.insert(record);
                }
            }
            Ok(())
        })
        .await?;

    info!(mobile_number = %mobile_number, "PIN user verified");

    Ok(Json(ApiEnvelope::ok(
        "Verification successful",
        PinVerifyData {
            mobile_number: response.description,
        },
    )))
}

/// Complete PIN signup; the provider issues the PIN.
pub async fn sign_up_pin_user(
    State(state): State<AppState>,
    payload: Result<Json<PinSignUpRequest>, JsonRejection>,
) -> Result<Created<PinSignUpData>, ProxyError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let Some(mobile_number) = present(request.mobile_number) else {
        return Err(ProxyError::Validation("Mobile number is required".to_string()));
    };
    info!(mobile_number = %mobile_number, "PIN signup request received");

    let not_verified = || ProxyError::Conflict("User not verified. Please verify first.".to_string());

    {
        let users = state.users.read().await;
        if !users
            .find_by_phone(&mobile_number)
            .is_some_and(|u| u.billing_verified)
        {
            return Err(not_verified());
        }
    }

    let params = PinSignUpParams {
        mobile_number: mobile_number.clone(),
        pinbatch_id: present(request.pinbatch_id),
        dont_send_mail: request.dont_send_mail,
    };

    let response = state
        .billing
        .sign_up_pin_user(&params)
        .await
        .map_err(|e| state.billing_failure("pin signup", e))?;
    if !response.is_success() {
        return Err(state.rejected("pin signup", &response.description));
    }

    let pin = response.description;
    state
        .commit(|users| {
            let record = users
                .find_by_phone_mut(&mobile_number)
                .ok_or_else(not_verified)?;
            if record.mark_pin_signed_up(pin.clone()) {
                Ok(())
            } else {
                Err(not_verified())
            }
        })
        .await?;

    info!(mobile_number = %mobile_number, "PIN user signed up");

    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::ok(
            "PIN user signup successful",
            PinSignUpData { pin, mobile_number },
        )),
    ))
}

/// Verify a prospective client account with the provider.
pub async fn verify_client(
    State(state): State<AppState>,
    payload: Result<Json<ClientVerifyRequest>, JsonRejection>,
) -> Result<Json<ApiEnvelope<ClientVerifyData>>, ProxyError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let (Some(username), Some(customer_type), Some(password)) = (
        present(request.username),
        present_value(request.customer_type),
        present(request.password),
    ) else {
        return Err(ProxyError::Validation(
            "Missing required fields: username, customerType, password".to_string(),
        ));
    };
    let customer_type = ClientType::from_json(&customer_type).map_err(|_| {
        ProxyError::Validation("Invalid customer type. Must be 1, 2, 3, or 4".to_string())
    })?;
    info!(username = %username, ?customer_type, "Client verify request received");

    let email = present(request.email);
    let candidate = UserRecord::new(
        username.clone(),
        email.clone().unwrap_or_else(|| placeholder_email(&username)),
        &password,
        present(request.mobile_number.clone()).unwrap_or_else(|| username.clone()),
        present(request.country_id.clone()).unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
    );

    {
        let users = state.users.read().await;
        match users.find_by_username(&username) {
            Some(existing) if existing.billing_verified => {
                warn!(username = %username, "Client already verified");
                return Err(ProxyError::Conflict("Client already verified".to_string()));
            }
            Some(_) => {}
            None => ensure_unclaimed(&users, &candidate)?,
        }
    }

    let params = ClientVerifyParams {
        ip: request.ip,
        balance: request.balance,
        rate_plan_id: request.rate_plan_id,
        top_up_rate_plan_id: request.top_up_rate_plan_id,
        org_prefix: request.org_prefix,
        org_prefix_rate_id: request.org_prefix_rate_id,
        ter_prefix: request.ter_prefix,
        ter_prefix_rate_id: request.ter_prefix_rate_id,
        caller_ids: request.caller_ids,
        first_name: request.first_name,
        last_name: request.last_name,
        address: request.address,
        company_name: request.company_name,
        state: request.state,
        country_id: request.country_id,
        email_address: email,
        fax: request.fax,
        mobile_number: request.mobile_number,
        info_from: request.info_from,
        currency: request.currency,
        language: request.language,
        ..ClientVerifyParams::new(username.clone(), customer_type, password.clone())
    };

    let response = state
        .billing
        .verify_client(&params)
        .await
        .map_err(|e| state.billing_failure("client verify", e))?;
    if !response.is_success() {
        return Err(state.rejected("client verify", &response.description));
    }

    state
        .commit(|users| {
            match users.find_by_username_mut(&username) {
                Some(existing) => existing.mark_client_verified(customer_type),
                None => {
                    ensure_unclaimed(users, &candidate)?;
                    let mut record = candidate;
                    record.mark_client_verified(customer_type);
                    users.insert(record);
                }
            }
            Ok(())
        })
        .await?;

    info!(username = %username, "Client verified");

    Ok(Json(ApiEnvelope::ok(
        "Client verification successful",
        ClientVerifyData {
            client_type: response.description,
        },
    )))
}

/// Complete client signup.
pub async fn sign_up_client(
    State(state): State<AppState>,
    payload: Result<Json<ClientSignUpRequest>, JsonRejection>,
) -> Result<Created<ClientSignUpData>, ProxyError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let Some(username) = present(request.username) else {
        return Err(ProxyError::Validation("Username is required".to_string()));
    };
    info!(username = %username, "Client signup request received");

    let not_verified =
        || ProxyError::Conflict("Client not verified. Please verify first.".to_string());

    {
        let users = state.users.read().await;
        if !users
            .find_by_username(&username)
            .is_some_and(|u| u.billing_verified)
        {
            return Err(not_verified());
        }
    }

    let params = ClientSignUpParams {
        username: username.clone(),
        dont_send_mail: request.dont_send_mail,
    };

    let response = state
        .billing
        .sign_up_client(&params)
        .await
        .map_err(|e| state.billing_failure("client signup", e))?;
    if !response.is_success() {
        return Err(state.rejected("client signup", &response.description));
    }

    state
        .commit(|users| {
            let record = users
                .find_by_username_mut(&username)
                .ok_or_else(not_verified)?;
            if record.mark_client_signed_up() {
                Ok(())
            } else {
                Err(not_verified())
            }
        })
        .await?;

    info!(username = %username, "Client signed up");

    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::ok(
            "Client signup successful",
            ClientSignUpData {
                username: response.description,
            },
        )),
    ))
}
