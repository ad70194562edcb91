//! Auction store: listings, images, categories and bid history.
//!
//! [`AuctionStore::place_bid`] is the only path that writes bids. Implementations
//! must run the lock/read/validate/insert sequence as one unit per listing.
// region:    --- Imports
use crate::bidding::model::{
    Bid, BidTarget, Category, Listing, ListingUpdate, NewBid, NewListing,
};
use crate::bidding::rules::{self, BidPolicy};
use crate::database::DatabaseManager;
use crate::error::{AppError, Result, ValidationError};
use crate::query::queries;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

mod in_memory;

pub use in_memory::InMemoryAuctionStore;

// endregion: --- Imports

// region:    --- Auction Store Trait
#[async_trait]
pub trait AuctionStore: Send + Sync {
    /// Atomically validate `bid` against the listing's current price and insert it.
    async fn place_bid(&self, bid: NewBid, policy: BidPolicy) -> Result<Bid>;

    async fn get_listing(&self, listing_id: i64) -> Result<Option<Listing>>;

    /// Bid history in display order.
    async fn get_listing_bids(&self, listing_id: i64) -> Result<Vec<Bid>>;

    /// Newest first.
    async fn get_listings(&self, include_inactive: bool) -> Result<Vec<Listing>>;

    async fn create_listing(&self, listing: NewListing) -> Result<i64>;

    async fn update_listing(&self, listing_id: i64, update: ListingUpdate) -> Result<()>;

    async fn delete_listing(&self, listing_id: i64) -> Result<()>;

    /// Ordered by name.
    async fn get_categories(&self) -> Result<Vec<Category>>;

    async fn create_category(&self, name: String) -> Result<Category>;
}

pub type SharedAuctionStore = Arc<dyn AuctionStore>;
// endregion: --- Auction Store Trait

// region:    --- Postgres Store
pub struct PostgresAuctionStore {
    db: Arc<DatabaseManager>,
}

impl PostgresAuctionStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuctionStore for PostgresAuctionStore {
    async fn place_bid(&self, bid: NewBid, policy: BidPolicy) -> Result<Bid> {
        self.db
            .transaction(move |tx| {
                Box::pin(async move {
                    // Concurrent bidders on this listing queue here until we commit or roll back.
                    let target = sqlx::query_as::<_, BidTarget>(queries::LOCK_LISTING_FOR_BID)
                        .bind(bid.listing_id)
                        .fetch_optional(&mut **tx)
                        .await?
                        .ok_or_else(|| AppError::listing_not_found(bid.listing_id))?;

                    let highest_bid = sqlx::query_scalar::<_, Option<i64>>(queries::GET_HIGHEST_BID)
                        .bind(bid.listing_id)
                        .fetch_one(&mut **tx)
                        .await?;

                    let beaten = rules::validate_bid(
                        &target,
                        highest_bid,
                        bid.amount,
                        policy,
                        Utc::now(),
                    )?;

                    let inserted = sqlx::query_as::<_, Bid>(queries::INSERT_BID)
                        .bind(bid.listing_id)
                        .bind(&bid.bidder_first_name)
                        .bind(&bid.bidder_last_name)
                        .bind(&bid.phone_number)
                        .bind(bid.amount)
                        .bind(bid.is_anonymous)
                        .fetch_one(&mut **tx)
                        .await?;

                    debug!(
                        "{:<12} --> bid {} inserted on listing {}: {} > {}",
                        "Store", inserted.id, inserted.listing_id, inserted.amount, beaten
                    );
                    Ok(inserted)
                })
            })
            .await
    }

    async fn get_listing(&self, listing_id: i64) -> Result<Option<Listing>> {
        let listing = sqlx::query_as::<_, Listing>(queries::GET_LISTING)
            .bind(listing_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(listing)
    }

    async fn get_listing_bids(&self, listing_id: i64) -> Result<Vec<Bid>> {
        let bids = sqlx::query_as::<_, Bid>(queries::GET_LISTING_BIDS)
            .bind(listing_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(bids)
    }

    async fn get_listings(&self, include_inactive: bool) -> Result<Vec<Listing>> {
        let sql = if include_inactive {
            queries::GET_ALL_LISTINGS
        } else {
            queries::GET_ACTIVE_LISTINGS
        };
        let listings = sqlx::query_as::<_, Listing>(sql)
            .fetch_all(self.db.pool())
            .await?;
        Ok(listings)
    }

    async fn create_listing(&self, listing: NewListing) -> Result<i64> {
        let listing_id = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    let listing_id = sqlx::query_scalar::<_, i64>(queries::INSERT_LISTING)
                        .bind(&listing.title)
                        .bind(&listing.description)
                        .bind(listing.starting_price)
                        .bind(listing.end_time)
                        .bind(listing.category_id)
                        .fetch_one(&mut **tx)
                        .await
                        .map_err(|e| classify_category_error(e, listing.category_id))?;

                    insert_images(tx, listing_id, &listing.images).await?;
                    Ok::<_, AppError>(listing_id)
                })
            })
            .await?;

        info!("{:<12} --> listing {} created", "Store", listing_id);
        Ok(listing_id)
    }

    async fn update_listing(&self, listing_id: i64, update: ListingUpdate) -> Result<()> {
        self.db
            .transaction(move |tx| {
                Box::pin(async move {
                    let result = sqlx::query(queries::UPDATE_LISTING)
                        .bind(&update.title)
                        .bind(&update.description)
                        .bind(update.end_time)
                        .bind(update.category_id)
                        .bind(update.active)
                        .bind(listing_id)
                        .execute(&mut **tx)
                        .await
                        .map_err(|e| classify_category_error(e, update.category_id))?;

                    if result.rows_affected() == 0 {
                        return Err(AppError::listing_not_found(listing_id));
                    }

                    if let Some(images) = &update.images {
                        sqlx::query(queries::DELETE_LISTING_IMAGES)
                            .bind(listing_id)
                            .execute(&mut **tx)
                            .await?;
                        insert_images(tx, listing_id, images).await?;
                    }
                    Ok(())
                })
            })
            .await
    }

    async fn delete_listing(&self, listing_id: i64) -> Result<()> {
        let result = sqlx::query(queries::DELETE_LISTING)
            .bind(listing_id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::listing_not_found(listing_id));
        }
        Ok(())
    }

    async fn get_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(queries::GET_CATEGORIES)
            .fetch_all(self.db.pool())
            .await?;
        Ok(categories)
    }

    async fn create_category(&self, name: String) -> Result<Category> {
        sqlx::query_as::<_, Category>(queries::INSERT_CATEGORY)
            .bind(&name)
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    ValidationError::DuplicateCategory(name.clone()).into()
                }
                _ => AppError::Storage(e),
            })
    }
}

async fn insert_images(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    listing_id: i64,
    images: &[String],
) -> std::result::Result<(), sqlx::Error> {
    for (display_order, image_url) in images.iter().enumerate() {
        sqlx::query(queries::INSERT_LISTING_IMAGE)
            .bind(listing_id)
            .bind(image_url)
            .bind(display_order as i32)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

fn classify_category_error(err: sqlx::Error, category_id: Option<i64>) -> AppError {
    if let (sqlx::Error::Database(db_err), Some(category_id)) = (&err, category_id) {
        if db_err.is_foreign_key_violation() {
            return ValidationError::UnknownCategory(category_id).into();
        }
    }
    AppError::Storage(err)
}
// endregion: --- Postgres Store
