//! Provider error codes.
//!
//! A failed call comes back as `status: "false"` with a `description` that is
//! either a bare code (`"5100"`) or a code plus detail (`"5100|extra"`).

use serde::Serialize;

/// A decoded provider error description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderError {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProviderError {
    /// Human readable text for this error's code.
    pub fn message(&self) -> &'static str {
        error_message(&self.code)
    }
}

/// Split a description on its first `|` into code and detail.
pub fn parse_error_code(description: &str) -> ProviderError {
    match description.split_once('|') {
        Some((code, detail)) => ProviderError {
            code: code.to_string(),
            detail: Some(detail.to_string()),
        },
        None => ProviderError {
            code: description.to_string(),
            detail: None,
        },
    }
}

/// Map a provider error code to its message.
pub fn error_message(code: &str) -> &'static str {
    match code {
        "5400" => "IP not allowed",
        "5001" => "Mobile number not provided",
        "5005" => "Password not provided",
        "5003" => "Caller ID not provided",
        "5100" => "Client already exists",
        "5103" => "Mobile number is not in Caller ID",
        "5104" => "Client not verified",
        "5500" => "Invalid type value",
        "5006" => "Username not provided",
        "5007" => "Customer type not provided",
        "5105" => "IP already exists",
        "5803" => "IP format is invalid",
        "5804" => "Port is invalid or out of range",
        "5805" => "Balance amount is invalid",
        "5801" => "Duplicate prefix found",
        "5802" => "Duplicate IP found",
        _ => "Unknown error",
    }
}

/// The provider refuses calls from addresses outside its whitelist.
pub const IP_NOT_ALLOWED: &str = "5400";
