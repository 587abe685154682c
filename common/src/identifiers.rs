//! Identifier types for CoreBank ledger entities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal identifier for an account.
///
/// Stable and never reused; assigned from a monotonic sequence by the
/// account store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(i64);

impl AccountId {
    /// Create from a raw identifier.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the underlying value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Internal identifier for a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MovementId(i64);

impl MovementId {
    /// Create from a raw identifier.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the underlying value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MovementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Internal identifier for a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PaymentId(i64);

impl PaymentId {
    /// Create from a raw identifier.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the underlying value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the user owning an account or payment.
///
/// Identity management itself lives outside the ledger core; this is an
/// opaque handle passed in by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(i64);

impl UserId {
    /// Create from a raw identifier.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the underlying value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External account number: a 12-digit string unique across all accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Create a new account number.
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Get the number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate the account number format: exactly 12 ASCII digits.
    pub fn is_valid(&self) -> bool {
        self.0.len() == 12 && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountNumber {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AccountNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// External customer number: an 11-digit string, first digit non-zero.
///
/// Customers are not modeled in the core; the number namespace is still
/// generated and collision-checked here on behalf of the surrounding
/// system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerNumber(String);

impl CustomerNumber {
    /// Create a new customer number.
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Get the number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate the customer number format: 11 ASCII digits, first non-zero.
    pub fn is_valid(&self) -> bool {
        self.0.len() == 11
            && self.0.bytes().all(|b| b.is_ascii_digit())
            && !self.0.starts_with('0')
    }
}

impl fmt::Display for CustomerNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Externally visible unique reference of a movement.
///
/// Shape: `TXN` followed by 12 uppercase hex characters. Immutable once
/// assigned and globally unique across all movements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovementReference(String);

impl MovementReference {
    /// Create a new movement reference.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Get the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate the reference format.
    pub fn is_valid(&self) -> bool {
        self.0.len() == 15
            && self.0.starts_with("TXN")
            && self.0[3..]
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
    }
}

impl fmt::Display for MovementReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MovementReference {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Correlation identifier assigned to a payment at creation.
///
/// Shape: `PAY-` followed by 8 uppercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Create a new correlation id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate the correlation id format.
    pub fn is_valid(&self) -> bool {
        self.0.len() == 12
            && self.0.starts_with("PAY-")
            && self.0[4..]
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
