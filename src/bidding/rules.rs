//! Acceptance rule for a single bid, evaluated inside the store's atomic unit.
use super::model::BidTarget;
use super::price;
use crate::error::ValidationError;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BidPolicy {
    /// Reject bids on inactive listings and after `end_time`.
    pub enforce_end_time: bool,
}

/// Check `amount` against the listing state observed under lock.
///
/// Returns the price the bid had to beat.
pub fn validate_bid(
    target: &BidTarget,
    highest_bid: Option<i64>,
    amount: i64,
    policy: BidPolicy,
    now: DateTime<Utc>,
) -> Result<i64, ValidationError> {
    if policy.enforce_end_time && (!target.active || now > target.end_time) {
        return Err(ValidationError::AuctionClosed);
    }

    let current_price = price::current_price(target.starting_price, highest_bid);
    if !price::outbids(amount, current_price) {
        return Err(ValidationError::BidTooLow { current_price });
    }

    Ok(current_price)
}
