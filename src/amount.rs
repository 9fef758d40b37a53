//! Native and credit amounts
//!
//! Amounts travel as decimal strings at the API surface and as signed 64-bit
//! stroop counts on the wire (1 unit = 10^7 stroops). Decimal parsing and
//! scaling are done by `stellar_base`; this type adds the wallet rules.

use std::fmt;
use std::str::FromStr;

use stellar_base::amount::{Amount as StellarAmount, Stroops};

use crate::error::WalletError;
use crate::Result;

pub const STROOPS_PER_UNIT: i64 = 10_000_000;

/// Non-negative amount in stroops
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

/// Minimum starting balance of an unsponsored account
pub const MIN_STARTING_BALANCE: Amount = Amount(STROOPS_PER_UNIT);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Largest representable amount, used as the default trust limit
    pub const MAX: Amount = Amount(i64::MAX);

    pub fn from_stroops(stroops: i64) -> Result<Self> {
        if stroops < 0 {
            return Err(WalletError::InvalidAmount(format!(
                "negative stroop count {}",
                stroops
            )));
        }
        Ok(Self(stroops))
    }

    pub fn stroops(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse a non-negative decimal with at most 7 fractional digits
    pub fn parse(input: &str) -> Result<Self> {
        let invalid =
            |reason: String| WalletError::InvalidAmount(format!("'{}': {}", input, reason));

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty".to_string()));
        }

        let stroops = StellarAmount::from_str(trimmed)
            .and_then(|amount| amount.to_stroops())
            .map_err(|e| invalid(e.to_string()))?;
        if stroops.0 < 0 {
            return Err(invalid("must not be negative".to_string()));
        }
        Ok(Self(stroops.0))
    }
}

impl FromStr for Amount {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Amount {
    /// Shortest decimal form: "0", "5", "0.5"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amount = StellarAmount::from_stroops(&Stroops::new(self.0)).map_err(|_| fmt::Error)?;
        let text = amount.to_string();
        if text.contains('.') {
            f.write_str(text.trim_end_matches('0').trim_end_matches('.'))
        } else {
            f.write_str(&text)
        }
    }
}
