/// Bid placement
/// 1. request parsing (name split, amount parsing)
/// 2. atomic commit through the store
/// 3. read-after-write snapshot
// region:    --- Imports
use super::model::NewBid;
use super::rules::BidPolicy;
use crate::auction_store::AuctionStore;
use crate::error::{AppError, Result, ValidationError};
use crate::query::handlers;
use crate::query::views::{BidView, ListingSnapshot};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Commands
/// Column widths of `bids.bidder_first_name` / `bidder_last_name` and `bids.phone_number`.
pub const MAX_NAME_PART_CHARS: usize = 100;
pub const MAX_PHONE_CHARS: usize = 20;

/// Bid body as submitted by a bidder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBidRequest {
    pub bidder_name: Option<String>,
    pub phone_number: Option<String>,
    /// Number or numeric string.
    pub amount: Option<Value>,
    pub is_anonymous: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceBidCommand {
    pub listing_id: i64,
    pub bidder_first_name: String,
    pub bidder_last_name: String,
    pub phone_number: String,
    pub amount: i64,
    pub is_anonymous: bool,
}

impl PlaceBidCommand {
    pub fn from_request(
        listing_id: i64,
        request: SubmitBidRequest,
    ) -> std::result::Result<Self, ValidationError> {
        let bidder_name = request.bidder_name.unwrap_or_default();
        let phone_number = request.phone_number.unwrap_or_default();

        if bidder_name.trim().is_empty()
            || phone_number.trim().is_empty()
            || !amount_present(request.amount.as_ref())
        {
            return Err(ValidationError::MissingFields);
        }

        let amount = parse_amount(request.amount.as_ref())?;
        let (bidder_first_name, bidder_last_name) = split_bidder_name(&bidder_name);
        check_lengths(&bidder_first_name, &bidder_last_name, phone_number.trim())?;

        Ok(Self {
            listing_id,
            bidder_first_name,
            bidder_last_name,
            phone_number: phone_number.trim().to_string(),
            amount,
            is_anonymous: request.is_anonymous.unwrap_or(false),
        })
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.bidder_first_name.trim().is_empty() || self.phone_number.trim().is_empty() {
            return Err(ValidationError::MissingFields);
        }
        match self.amount {
            0 => return Err(ValidationError::MissingFields),
            a if a < 0 => return Err(ValidationError::InvalidAmount),
            _ => {}
        }
        check_lengths(
            &self.bidder_first_name,
            &self.bidder_last_name,
            &self.phone_number,
        )
    }
}

impl From<PlaceBidCommand> for NewBid {
    fn from(cmd: PlaceBidCommand) -> Self {
        NewBid {
            listing_id: cmd.listing_id,
            bidder_first_name: cmd.bidder_first_name,
            bidder_last_name: cmd.bidder_last_name,
            phone_number: cmd.phone_number,
            amount: cmd.amount,
            is_anonymous: cmd.is_anonymous,
        }
    }
}

/// Place a bid and return the listing as it stands right after the commit.
///
/// Only the store call is atomic. The snapshot is assembled from separate
/// reads, but its `current_price` is pinned to the accepted amount. Anonymous
/// bids from anyone else are masked as on the public listing view.
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    store: &dyn AuctionStore,
    policy: BidPolicy,
) -> Result<ListingSnapshot> {
    info!(
        "{:<12} --> place bid on listing {}: amount {}",
        "Command", cmd.listing_id, cmd.amount
    );
    cmd.validate()?;

    let listing_id = cmd.listing_id;
    let bid = match store.place_bid(cmd.into(), policy).await {
        Ok(bid) => bid,
        Err(e) => {
            match &e {
                AppError::Storage(_) => warn!(
                    "{:<12} --> bid on listing {} rolled back: {}",
                    "Command", listing_id, e
                ),
                _ => info!(
                    "{:<12} --> bid on listing {} rejected: {}",
                    "Command", listing_id, e
                ),
            }
            return Err(e);
        }
    };
    info!(
        "{:<12} --> bid {} accepted on listing {}",
        "Command", bid.id, listing_id
    );

    // Other bidders stay masked; the caller sees their own bid as submitted.
    let mut snapshot = handlers::get_listing_snapshot(store, listing_id).await?;
    if let Some(own) = snapshot.bids.iter_mut().find(|view| view.id == bid.id) {
        *own = BidView::from(&bid);
    }
    snapshot.current_price = bid.amount;
    Ok(snapshot)
}
// endregion: --- Commands

// region:    --- Parsing
/// First whitespace token is the first name, the rest (single-spaced) the last name.
pub fn split_bidder_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

fn check_lengths(
    first_name: &str,
    last_name: &str,
    phone_number: &str,
) -> std::result::Result<(), ValidationError> {
    if first_name.chars().count() > MAX_NAME_PART_CHARS
        || last_name.chars().count() > MAX_NAME_PART_CHARS
    {
        return Err(ValidationError::BidderNameTooLong {
            max: MAX_NAME_PART_CHARS,
        });
    }
    if phone_number.chars().count() > MAX_PHONE_CHARS {
        return Err(ValidationError::InvalidPhoneNumber);
    }
    Ok(())
}

fn amount_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Whole units only. Zero counts as missing, like an empty field.
pub fn parse_amount(value: Option<&Value>) -> std::result::Result<i64, ValidationError> {
    let amount = match value {
        None | Some(Value::Null) => return Err(ValidationError::MissingFields),
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().and_then(whole_units)),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Err(ValidationError::MissingFields);
            }
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_units))
        }
        Some(_) => None,
    };

    match amount {
        Some(0) => Err(ValidationError::MissingFields),
        Some(a) if a > 0 => Ok(a),
        _ => Err(ValidationError::InvalidAmount),
    }
}

fn whole_units(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}
// endregion: --- Parsing

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction_store::InMemoryAuctionStore;
    use crate::bidding::model::NewListing;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn request(name: &str, phone: &str, amount: Value) -> SubmitBidRequest {
        SubmitBidRequest {
            bidder_name: Some(name.to_string()),
            phone_number: Some(phone.to_string()),
            amount: Some(amount),
            is_anonymous: None,
        }
    }

    fn bid(listing_id: i64, amount: i64) -> PlaceBidCommand {
        PlaceBidCommand::from_request(listing_id, request("Marie Curie", "0611223344", json!(amount)))
            .unwrap()
    }

    async fn store_with_listing(starting_price: i64) -> (InMemoryAuctionStore, i64) {
        let store = InMemoryAuctionStore::new();
        let id = store
            .create_listing(NewListing {
                title: "Montre".to_string(),
                description: "Acier".to_string(),
                starting_price,
                end_time: Utc::now() + Duration::hours(3),
                category_id: None,
                images: vec![],
            })
            .await
            .unwrap();
        (store, id)
    }

    #[test]
    fn splits_bidder_name_on_whitespace() {
        assert_eq!(
            split_bidder_name("Jean  Paul   Sartre"),
            ("Jean".to_string(), "Paul Sartre".to_string())
        );
        assert_eq!(
            split_bidder_name("Colette"),
            ("Colette".to_string(), String::new())
        );
    }

    #[test]
    fn parses_numbers_and_numeric_strings() {
        assert_eq!(parse_amount(Some(&json!(150))), Ok(150));
        assert_eq!(parse_amount(Some(&json!(150.0))), Ok(150));
        assert_eq!(parse_amount(Some(&json!(" 42 "))), Ok(42));
        assert_eq!(parse_amount(Some(&json!(0))), Err(ValidationError::MissingFields));
        assert_eq!(parse_amount(Some(&json!(10.5))), Err(ValidationError::InvalidAmount));
        assert_eq!(parse_amount(Some(&json!("abc"))), Err(ValidationError::InvalidAmount));
        assert_eq!(parse_amount(Some(&json!(-5))), Err(ValidationError::InvalidAmount));
        assert_eq!(parse_amount(Some(&json!(true))), Err(ValidationError::InvalidAmount));
    }

    #[test]
    fn missing_fields_are_reported_before_bad_amount() {
        let err = PlaceBidCommand::from_request(1, request("  ", "0611223344", json!("abc")))
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingFields);

        let err = PlaceBidCommand::from_request(
            1,
            SubmitBidRequest {
                bidder_name: Some("Marie".to_string()),
                phone_number: Some("0611223344".to_string()),
                amount: None,
                is_anonymous: Some(true),
            },
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::MissingFields);

        let err = PlaceBidCommand::from_request(1, request("Marie", "0611223344", json!("abc")))
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidAmount);
    }

    #[tokio::test]
    async fn bid_sequence_from_starting_price() {
        let (store, id) = store_with_listing(100).await;
        let policy = BidPolicy::default();

        let err = handle_place_bid(bid(id, 100), &store, policy).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::BidTooLow { current_price: 100 })
        ));

        let snapshot = handle_place_bid(bid(id, 101), &store, policy).await.unwrap();
        assert_eq!(snapshot.current_price, 101);

        let err = handle_place_bid(bid(id, 101), &store, policy).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::BidTooLow { current_price: 101 })
        ));

        let snapshot = handle_place_bid(bid(id, 150), &store, policy).await.unwrap();
        assert_eq!(snapshot.current_price, 150);
        let amounts: Vec<i64> = snapshot.bids.iter().map(|b| b.amount).collect();
        assert_eq!(amounts, vec![150, 101]);
        assert_eq!(snapshot.bids[0].bidder_name, "Marie Curie");
        assert_eq!(snapshot.starting_price, 100);
    }

    #[tokio::test]
    async fn unknown_listing_inserts_nothing() {
        let (store, id) = store_with_listing(100).await;

        let err = handle_place_bid(bid(9999, 500), &store, BidPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let listing = store.get_listing(id).await.unwrap().unwrap();
        assert_eq!(listing.bids_count, 0);
    }

    #[tokio::test]
    async fn own_anonymous_bid_is_returned_unmasked() {
        let (store, id) = store_with_listing(10).await;
        let mut req = request("Anne", "0611223344", json!(20));
        req.is_anonymous = Some(true);
        let cmd = PlaceBidCommand::from_request(id, req).unwrap();

        let snapshot = handle_place_bid(cmd, &store, BidPolicy::default())
            .await
            .unwrap();
        assert!(snapshot.bids[0].is_anonymous);
        assert_eq!(snapshot.bids[0].bidder_name, "Anne");
        assert_eq!(snapshot.bids[0].phone_number, "0611223344");
    }

    #[tokio::test]
    async fn other_anonymous_bids_are_masked_in_bid_response() {
        let (store, id) = store_with_listing(10).await;
        let mut req = request("Anne Secret", "0611111111", json!(20));
        req.is_anonymous = Some(true);
        let cmd = PlaceBidCommand::from_request(id, req).unwrap();
        handle_place_bid(cmd, &store, BidPolicy::default())
            .await
            .unwrap();

        let snapshot = handle_place_bid(bid(id, 21), &store, BidPolicy::default())
            .await
            .unwrap();
        assert_eq!(snapshot.bids[0].bidder_name, "Marie Curie");
        assert_eq!(snapshot.bids[0].phone_number, "0611223344");
        assert!(snapshot.bids[1].is_anonymous);
        assert_eq!(snapshot.bids[1].bidder_name, "Anonyme");
        assert_eq!(snapshot.bids[1].phone_number, "");
    }

    #[tokio::test]
    async fn over_long_bidder_name_is_rejected_before_storage() {
        let (store, id) = store_with_listing(10).await;
        let long_last_name = "x".repeat(MAX_NAME_PART_CHARS + 1);

        let err = PlaceBidCommand::from_request(
            id,
            request(&format!("Anne {}", long_last_name), "0611223344", json!(20)),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::BidderNameTooLong {
                max: MAX_NAME_PART_CHARS
            }
        );

        let exact = "é".repeat(MAX_NAME_PART_CHARS);
        assert!(PlaceBidCommand::from_request(
            id,
            request(&format!("{} {}", exact, exact), "0611223344", json!(20)),
        )
        .is_ok());

        let mut cmd = bid(id, 20);
        cmd.bidder_last_name = long_last_name;
        let err = handle_place_bid(cmd, &store, BidPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::BidderNameTooLong { .. })
        ));
        assert!(store.get_listing_bids(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_bids_serialise() {
        let (store, id) = store_with_listing(150).await;
        let store = std::sync::Arc::new(store);

        let mut handles = vec![];
        for amount in [200, 250] {
            let store = std::sync::Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                handle_place_bid(bid(id, amount), &*store, BidPolicy::default()).await
            }));
        }
        for handle in handles {
            let _ = handle.await.unwrap();
        }

        let mut bids = store.get_listing_bids(id).await.unwrap();
        assert_eq!(bids[0].amount, 250);
        assert_eq!(bids.iter().filter(|b| b.amount == 250).count(), 1);

        // In commit order every accepted bid must exceed the one before it.
        bids.sort_by_key(|b| b.id);
        assert!(bids.windows(2).all(|w| w[1].amount > w[0].amount));
    }
}
