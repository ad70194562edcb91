use super::price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label shown for listings without a category.
pub const DEFAULT_CATEGORY: &str = "Autres";

/// Name shown in place of an anonymous bidder.
pub const ANONYMOUS_BIDDER: &str = "Anonyme";

// Listing as read back from the store, with its bid aggregates.
// `highest_bid` and `bids_count` are computed by the read query, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Listing {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub starting_price: i64,
    pub end_time: DateTime<Utc>,
    pub active: bool,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub images: Vec<String>,
    pub highest_bid: Option<i64>,
    pub bids_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn current_price(&self) -> i64 {
        price::current_price(self.starting_price, self.highest_bid)
    }

    pub fn category_label(&self) -> String {
        self.category_name
            .clone()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
    }
}

/// The listing columns the bid rules look at, read under the row lock.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BidTarget {
    pub id: i64,
    pub starting_price: i64,
    pub end_time: DateTime<Utc>,
    pub active: bool,
}

// Bid row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub listing_id: i64,
    pub bidder_first_name: String,
    pub bidder_last_name: String,
    pub phone_number: String,
    pub amount: i64,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

impl Bid {
    pub fn bidder_name(&self) -> String {
        if self.bidder_last_name.is_empty() {
            self.bidder_first_name.clone()
        } else {
            format!("{} {}", self.bidder_first_name, self.bidder_last_name)
        }
    }
}

/// A bid that passed input validation and is waiting to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBid {
    pub listing_id: i64,
    pub bidder_first_name: String,
    pub bidder_last_name: String,
    pub phone_number: String,
    pub amount: i64,
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub starting_price: i64,
    pub end_time: DateTime<Utc>,
    pub category_id: Option<i64>,
    pub images: Vec<String>,
}

/// Editable listing fields. The starting price is fixed at creation.
#[derive(Debug, Clone)]
pub struct ListingUpdate {
    pub title: String,
    pub description: String,
    pub end_time: DateTime<Utc>,
    pub category_id: Option<i64>,
    pub active: bool,
    /// `None` keeps the current images.
    pub images: Option<Vec<String>>,
}

/// Display order: amount descending, then newest first.
pub fn sort_for_display(bids: &mut [Bid]) {
    bids.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    });
}
