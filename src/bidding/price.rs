//! Current price derivation.
//!
//! The current price of a listing is the highest bid amount, or the starting
//! price while nobody has bid. Every read path and the bid acceptor go through
//! [`current_price`] so the price shown and the price validated against can
//! never diverge.

pub fn current_price(starting_price: i64, highest_bid: Option<i64>) -> i64 {
    highest_bid.unwrap_or(starting_price)
}

/// Highest amount in a bid set.
pub fn highest_bid<I>(amounts: I) -> Option<i64>
where
    I: IntoIterator<Item = i64>,
{
    amounts.into_iter().max()
}

/// A bid outbids the current price only when strictly greater.
pub fn outbids(amount: i64, current_price: i64) -> bool {
    amount > current_price
}
