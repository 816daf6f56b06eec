//! In-memory user directory.

use super::UserRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// In-memory index of user records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDirectory {
    /// User records indexed by id
    records: HashMap<Uuid, UserRecord>,
}

impl UserDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Insert or replace a record.
    pub fn insert(&mut self, record: UserRecord) {
        self.records.insert(record.id, record);
    }

    fn find(&self, pred: impl Fn(&UserRecord) -> bool) -> Option<&UserRecord> {
        self.records.values().find(|&r| pred(r))
    }

    fn find_mut(&mut self, pred: impl Fn(&UserRecord) -> bool) -> Option<&mut UserRecord> {
        self.records.values_mut().find(|r| pred(&**r))
    }

    pub fn find_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.find(|r| r.email == email)
    }

    pub fn find_by_phone(&self, phone_number: &str) -> Option<&UserRecord> {
        self.find(|r| r.phone_number == phone_number)
    }

    pub fn find_by_phone_mut(&mut self, phone_number: &str) -> Option<&mut UserRecord> {
        self.find_mut(|r| r.phone_number == phone_number)
    }

    pub fn find_by_username(&self, username: &str) -> Option<&UserRecord> {
        self.find(|r| r.username == username)
    }

    pub fn find_by_username_mut(&mut self, username: &str) -> Option<&mut UserRecord> {
        self.find_mut(|r| r.username == username)
    }

    /// Look up the record holding a provider-issued PIN.
    pub fn find_by_pin(&self, pin: &str) -> Option<&UserRecord> {
        self.find(|r| r.billing_pin.as_deref() == Some(pin))
    }

    /// Check whether any record uses this email or phone number.
    pub fn exists_with_email_or_phone(&self, email: &str, phone_number: &str) -> bool {
        self.records
            .values()
            .any(|r| r.email == email || r.phone_number == phone_number)
    }

    /// Number of records.
    pub fn count(&self) -> usize {
        self.records.len()
    }
}
