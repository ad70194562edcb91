//! Wire shapes returned to callers. Field names are camelCase on the wire.
use crate::bidding::model::{Bid, Listing, ANONYMOUS_BIDDER};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BidView {
    pub id: i64,
    pub bidder_name: String,
    pub phone_number: String,
    pub amount: i64,
    pub is_anonymous: bool,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl From<&Bid> for BidView {
    fn from(bid: &Bid) -> Self {
        Self {
            id: bid.id,
            bidder_name: bid.bidder_name(),
            phone_number: bid.phone_number.clone(),
            amount: bid.amount,
            is_anonymous: bid.is_anonymous,
            timestamp: bid.created_at.timestamp_millis(),
        }
    }
}

impl BidView {
    /// Hide identity and contact details of anonymous bidders.
    pub fn masked(mut self) -> Self {
        if self.is_anonymous {
            self.bidder_name = ANONYMOUS_BIDDER.to_string();
            self.phone_number = String::new();
        }
        self
    }
}

/// A listing with its full bid history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSnapshot {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
    pub starting_price: i64,
    pub current_price: i64,
    /// Epoch milliseconds
    pub end_time: i64,
    pub bids: Vec<BidView>,
    pub category: String,
    pub active: bool,
}

/// Catalogue entry. `bids` is always empty; `bids_count` carries the total.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
    pub starting_price: i64,
    pub current_price: i64,
    pub end_time: i64,
    pub bids: Vec<BidView>,
    pub bids_count: i64,
    pub category: String,
    pub active: bool,
}

impl From<Listing> for ListingSummary {
    fn from(listing: Listing) -> Self {
        Self {
            current_price: listing.current_price(),
            category: listing.category_label(),
            id: listing.id,
            title: listing.title,
            description: listing.description,
            images: listing.images,
            starting_price: listing.starting_price,
            end_time: listing.end_time.timestamp_millis(),
            bids: Vec::new(),
            bids_count: listing.bids_count,
            active: listing.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminListingView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
    pub starting_price: i64,
    pub current_price: i64,
    pub end_time: DateTime<Utc>,
    pub category: String,
    pub category_id: Option<i64>,
    pub active: bool,
    pub bids_count: i64,
}

impl From<Listing> for AdminListingView {
    fn from(listing: Listing) -> Self {
        Self {
            current_price: listing.current_price(),
            category: listing.category_label(),
            id: listing.id,
            title: listing.title,
            description: listing.description,
            images: listing.images,
            starting_price: listing.starting_price,
            end_time: listing.end_time,
            category_id: listing.category_id,
            active: listing.active,
            bids_count: listing.bids_count,
        }
    }
}
