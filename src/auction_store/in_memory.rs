use super::*;
use crate::bidding::model::sort_for_display;
use crate::bidding::price;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// In-memory auction store.
///
/// Every operation runs under one mutex, so bid commits are serialised across
/// all listings. Useful for tests and for running the service without a database.
#[derive(Default)]
pub struct InMemoryAuctionStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    last_listing_id: i64,
    last_bid_id: i64,
    last_category_id: i64,
    listings: BTreeMap<i64, StoredListing>,
    bids: Vec<Bid>,
    categories: Vec<Category>,
}

struct StoredListing {
    title: String,
    description: String,
    starting_price: i64,
    end_time: DateTime<Utc>,
    active: bool,
    category_id: Option<i64>,
    images: Vec<String>,
    created_at: DateTime<Utc>,
}

impl InMemoryAuctionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> SharedAuctionStore {
        Arc::new(Self::new())
    }
}

impl State {
    fn bids_of(&self, listing_id: i64) -> impl Iterator<Item = &Bid> {
        self.bids.iter().filter(move |b| b.listing_id == listing_id)
    }

    fn ensure_category(&self, category_id: Option<i64>) -> Result<()> {
        match category_id {
            Some(id) if !self.categories.iter().any(|c| c.id == id) => {
                Err(ValidationError::UnknownCategory(id).into())
            }
            _ => Ok(()),
        }
    }

    fn to_listing(&self, id: i64, stored: &StoredListing) -> Listing {
        Listing {
            id,
            title: stored.title.clone(),
            description: stored.description.clone(),
            starting_price: stored.starting_price,
            end_time: stored.end_time,
            active: stored.active,
            category_id: stored.category_id,
            category_name: stored.category_id.and_then(|category_id| {
                self.categories
                    .iter()
                    .find(|c| c.id == category_id)
                    .map(|c| c.name.clone())
            }),
            images: stored.images.clone(),
            highest_bid: price::highest_bid(self.bids_of(id).map(|b| b.amount)),
            bids_count: self.bids_of(id).count() as i64,
            created_at: stored.created_at,
        }
    }
}

#[async_trait]
impl AuctionStore for InMemoryAuctionStore {
    async fn place_bid(&self, bid: NewBid, policy: BidPolicy) -> Result<Bid> {
        let mut state = self.state.lock().await;

        let target = state
            .listings
            .get(&bid.listing_id)
            .map(|stored| BidTarget {
                id: bid.listing_id,
                starting_price: stored.starting_price,
                end_time: stored.end_time,
                active: stored.active,
            })
            .ok_or_else(|| AppError::listing_not_found(bid.listing_id))?;

        let highest_bid = price::highest_bid(state.bids_of(bid.listing_id).map(|b| b.amount));
        rules::validate_bid(&target, highest_bid, bid.amount, policy, Utc::now())?;

        state.last_bid_id += 1;
        let inserted = Bid {
            id: state.last_bid_id,
            listing_id: bid.listing_id,
            bidder_first_name: bid.bidder_first_name,
            bidder_last_name: bid.bidder_last_name,
            phone_number: bid.phone_number,
            amount: bid.amount,
            is_anonymous: bid.is_anonymous,
            created_at: Utc::now(),
        };
        state.bids.push(inserted.clone());
        Ok(inserted)
    }

    async fn get_listing(&self, listing_id: i64) -> Result<Option<Listing>> {
        let state = self.state.lock().await;
        Ok(state
            .listings
            .get(&listing_id)
            .map(|stored| state.to_listing(listing_id, stored)))
    }

    async fn get_listing_bids(&self, listing_id: i64) -> Result<Vec<Bid>> {
        let state = self.state.lock().await;
        let mut bids: Vec<Bid> = state.bids_of(listing_id).cloned().collect();
        sort_for_display(&mut bids);
        Ok(bids)
    }

    async fn get_listings(&self, include_inactive: bool) -> Result<Vec<Listing>> {
        let state = self.state.lock().await;
        let mut listings: Vec<Listing> = state
            .listings
            .iter()
            .filter(|(_, stored)| include_inactive || stored.active)
            .map(|(id, stored)| state.to_listing(*id, stored))
            .collect();
        listings.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(listings)
    }

    async fn create_listing(&self, listing: NewListing) -> Result<i64> {
        let mut state = self.state.lock().await;
        state.ensure_category(listing.category_id)?;

        state.last_listing_id += 1;
        let listing_id = state.last_listing_id;
        state.listings.insert(
            listing_id,
            StoredListing {
                title: listing.title,
                description: listing.description,
                starting_price: listing.starting_price,
                end_time: listing.end_time,
                active: true,
                category_id: listing.category_id,
                images: listing.images,
                created_at: Utc::now(),
            },
        );
        Ok(listing_id)
    }

    async fn update_listing(&self, listing_id: i64, update: ListingUpdate) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.listings.contains_key(&listing_id) {
            return Err(AppError::listing_not_found(listing_id));
        }
        state.ensure_category(update.category_id)?;

        let stored = state
            .listings
            .get_mut(&listing_id)
            .ok_or_else(|| AppError::listing_not_found(listing_id))?;
        stored.title = update.title;
        stored.description = update.description;
        stored.end_time = update.end_time;
        stored.category_id = update.category_id;
        stored.active = update.active;
        if let Some(images) = update.images {
            stored.images = images;
        }
        Ok(())
    }

    async fn delete_listing(&self, listing_id: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.listings.remove(&listing_id).is_none() {
            return Err(AppError::listing_not_found(listing_id));
        }
        state.bids.retain(|b| b.listing_id != listing_id);
        Ok(())
    }

    async fn get_categories(&self) -> Result<Vec<Category>> {
        let state = self.state.lock().await;
        let mut categories = state.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn create_category(&self, name: String) -> Result<Category> {
        let mut state = self.state.lock().await;
        if state.categories.iter().any(|c| c.name == name) {
            return Err(ValidationError::DuplicateCategory(name).into());
        }
        state.last_category_id += 1;
        let category = Category {
            id: state.last_category_id,
            name,
            created_at: Utc::now(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }
}
