//! Billing client errors.

use crate::types::ApiResponse;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    /// The provider answered with a non-2xx status.
    #[error("iTelBilling API error: {status} - {body}")]
    Api { status: u16, body: String },

    /// The request went out but nothing came back (timeout, refused connection).
    #[error("No response from iTelBilling API")]
    NoResponse,

    #[error("HTTP error: {0}")]
    Transport(reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Decode(String),

    /// The provider returned a `status: "false"` envelope where a result was expected.
    #[error("iTelBilling rejected the request: {}", .0.description)]
    Rejected(ApiResponse),
}

impl From<reqwest::Error> for BillingError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            BillingError::NoResponse
        } else {
            BillingError::Transport(e)
        }
    }
}

/// A parameter value the provider would reject outright.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {field}: {value}")]
pub struct InvalidParam {
    pub field: &'static str,
    pub value: String,
}

impl InvalidParam {
    pub(crate) fn new(field: &'static str, value: impl ToString) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}
