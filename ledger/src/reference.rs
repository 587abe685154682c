//! Collision-free generation of external identifiers.
//!
//! Candidates are drawn from OS entropy and checked against the owning
//! namespace before acceptance. Keyspaces are at least 10^12 combinations,
//! so generation is O(1) amortized; the retry cap only trips under
//! pathological collision rates and surfaces as a fatal
//! `DuplicateReference`.

use corebank_common::{
    AccountNumber, CorrelationId, CustomerNumber, LedgerError, MovementReference, Result,
};
use rand::rngs::OsRng;
use rand::Rng;
use uuid::Uuid;

/// Maximum candidates tried per generation before giving up.
const MAX_ATTEMPTS: usize = 16;

/// Generator for movement references, payment correlation ids, account
/// numbers and customer numbers.
#[derive(Debug, Default)]
pub struct ReferenceGenerator;

impl ReferenceGenerator {
    /// Create a new generator.
    pub fn new() -> Self {
        Self
    }

    /// Generate a unique movement reference: `TXN` + 12 uppercase hex.
    pub fn movement_reference(
        &self,
        exists: impl Fn(&MovementReference) -> bool,
    ) -> Result<MovementReference> {
        self.generate("movement_reference", exists, || {
            let hex = Uuid::new_v4().simple().to_string().to_uppercase();
            MovementReference::new(format!("TXN{}", &hex[..12]))
        })
    }

    /// Generate a unique payment correlation id: `PAY-` + 8 uppercase hex.
    pub fn correlation_id(
        &self,
        exists: impl Fn(&CorrelationId) -> bool,
    ) -> Result<CorrelationId> {
        self.generate("correlation_id", exists, || {
            let hex = Uuid::new_v4().simple().to_string().to_uppercase();
            CorrelationId::new(format!("PAY-{}", &hex[..8]))
        })
    }

    /// Generate a unique 12-digit account number.
    pub fn account_number(
        &self,
        exists: impl Fn(&AccountNumber) -> bool,
    ) -> Result<AccountNumber> {
        self.generate("account_number", exists, || {
            AccountNumber::new(random_digits(12, false))
        })
    }

    /// Generate a unique 11-digit customer number (first digit non-zero).
    pub fn customer_number(
        &self,
        exists: impl Fn(&CustomerNumber) -> bool,
    ) -> Result<CustomerNumber> {
        self.generate("customer_number", exists, || {
            CustomerNumber::new(random_digits(11, true))
        })
    }

    fn generate<T>(
        &self,
        namespace: &'static str,
        exists: impl Fn(&T) -> bool,
        candidate: impl Fn() -> T,
    ) -> Result<T> {
        for _ in 0..MAX_ATTEMPTS {
            let value = candidate();
            if !exists(&value) {
                return Ok(value);
            }
        }
        Err(LedgerError::DuplicateReference { namespace })
    }
}

fn random_digits(len: usize, leading_non_zero: bool) -> String {
    let mut rng = OsRng;
    let mut digits = String::with_capacity(len);
    for i in 0..len {
        let low: u8 = if leading_non_zero && i == 0 { 1 } else { 0 };
        let digit = rng.gen_range(low..10);
        digits.push(char::from(b'0' + digit));
    }
    digits
}
