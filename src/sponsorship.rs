//! Sponsored reserves
//!
//! A sponsor pays the minimum-balance reserve of another account by
//! bracketing the reserve-consuming operation:
//!
//! ```text
//! BeginSponsoringFutureReserves   source = sponsor,   sponsored_id = sponsored
//! <inner operation>               source = sponsored
//! EndSponsoringFutureReserves     source = sponsored
//! ```
//!
//! The network does not tell you which attribution was wrong when a bracket
//! is malformed, so the attribution lives in exactly one place:
//! [`wrap_with_sponsorship`].

use crate::address::Address;
use crate::operation::{Operation, OperationBody};

/// Who pays the reserve for a new ledger entry
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Sponsorship {
    Sponsored {
        sponsor: Address,
    },
    #[default]
    Unsponsored,
}

impl Sponsorship {
    pub fn sponsored_by(sponsor: impl Into<Address>) -> Self {
        Self::Sponsored {
            sponsor: sponsor.into(),
        }
    }

    /// Blank or missing sponsor means unsponsored
    pub fn from_optional_str(sponsor: Option<&str>) -> Self {
        match sponsor.map(str::trim) {
            Some(sponsor) if !sponsor.is_empty() => Self::sponsored_by(sponsor),
            _ => Self::Unsponsored,
        }
    }

    pub fn is_sponsored(&self) -> bool {
        matches!(self, Self::Sponsored { .. })
    }

    pub fn sponsor(&self) -> Option<&Address> {
        match self {
            Self::Sponsored { sponsor } => Some(sponsor),
            Self::Unsponsored => None,
        }
    }

    /// Wrap `inner` for `sponsored` when sponsored, otherwise pass it through
    pub fn apply(&self, sponsored: &Address, inner: Operation) -> Vec<Operation> {
        match self {
            Self::Sponsored { sponsor } => wrap_with_sponsorship(sponsor, sponsored, inner),
            Self::Unsponsored => vec![inner],
        }
    }
}

/// Produce the three-operation sponsorship bracket around `inner`
///
/// Performs no blank checks; callers decide whether sponsorship applies.
pub fn wrap_with_sponsorship(
    sponsor: &Address,
    sponsored: &Address,
    inner: Operation,
) -> Vec<Operation> {
    log::debug!(
        "Sponsoring {} for {} by {}",
        inner.kind(),
        sponsored,
        sponsor
    );

    vec![
        Operation::new(OperationBody::BeginSponsoringFutureReserves {
            sponsored_id: sponsored.clone(),
        })
        .with_source(sponsor.clone()),
        inner.with_source(sponsored.clone()),
        Operation::new(OperationBody::EndSponsoringFutureReserves).with_source(sponsored.clone()),
    ]
}
