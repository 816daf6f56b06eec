//! User records with encrypted persistence.

mod directory;
mod encrypted;

pub use directory::UserDirectory;
pub use encrypted::{EncryptedStore, MemoryStore, Store};

use crate::auth::{hash_password, verify_password};
use chrono::{DateTime, Utc};
use itel_billing_client::ClientType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a principal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Where a record stands with the billing provider.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum BillingState {
    /// Never verified with the provider
    Absent,
    /// Provider confirmed identity/eligibility
    Verified,
    /// Provider completed signup
    SignedUp,
}

/// A user known to this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Salted hash, see [`crate::auth::hash_password`]
    pub password_hash: String,
    pub phone_number: String,
    pub country: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub billing_verified: bool,
    #[serde(default)]
    pub billing_signed_up: bool,
    #[serde(default)]
    pub billing_pin: Option<String>,
    #[serde(default)]
    pub billing_mobile_number: Option<String>,
    #[serde(default)]
    pub billing_client_type: Option<ClientType>,
}

impl UserRecord {
    /// Create a record in the `absent` billing state.
    pub fn new(
        username: String,
        email: String,
        password: &str,
        phone_number: String,
        country: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash: hash_password(password),
            phone_number,
            country,
            role: Role::User,
            created_at: Utc::now(),
            billing_verified: false,
            billing_signed_up: false,
            billing_pin: None,
            billing_mobile_number: None,
            billing_client_type: None,
        }
    }

    pub fn billing_state(&self) -> BillingState {
        if self.billing_signed_up {
            BillingState::SignedUp
        } else if self.billing_verified {
            BillingState::Verified
        } else {
            BillingState::Absent
        }
    }

    pub fn check_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }

    /// Record a successful PIN verify.
    pub fn mark_pin_verified(&mut self, mobile_number: String) {
        self.billing_verified = true;
        self.billing_mobile_number = Some(mobile_number);
    }

    /// Record a successful client verify.
    pub fn mark_client_verified(&mut self, client_type: ClientType) {
        self.billing_verified = true;
        self.billing_client_type = Some(client_type);
    }

    /// Record a successful PIN signup. Returns false if the record is not verified.
    pub fn mark_pin_signed_up(&mut self, pin: String) -> bool {
        if !self.billing_verified {
            return false;
        }
        self.billing_signed_up = true;
        self.billing_pin = Some(pin);
        true
    }

    /// Record a successful client signup. Returns false if the record is not verified.
    pub fn mark_client_signed_up(&mut self) -> bool {
        if !self.billing_verified {
            return false;
        }
        self.billing_signed_up = true;
        true
    }
}
