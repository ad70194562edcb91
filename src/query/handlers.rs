// region:    --- Imports
use super::views::{AdminListingView, BidView, ListingSnapshot, ListingSummary};
use crate::auction_store::AuctionStore;
use crate::bidding::model::Category;
use crate::error::{AppError, Result};
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// Listing with images and bid history, anonymous bidders masked
pub async fn get_listing_snapshot(
    store: &dyn AuctionStore,
    listing_id: i64,
) -> Result<ListingSnapshot> {
    info!("{:<12} --> listing snapshot id: {}", "Query", listing_id);
    let listing = store
        .get_listing(listing_id)
        .await?
        .ok_or_else(|| AppError::listing_not_found(listing_id))?;
    let bids = store.get_listing_bids(listing_id).await?;

    let bids = bids.iter().map(|bid| BidView::from(bid).masked()).collect();

    Ok(ListingSnapshot {
        current_price: listing.current_price(),
        category: listing.category_label(),
        id: listing.id,
        title: listing.title,
        description: listing.description,
        images: listing.images,
        starting_price: listing.starting_price,
        end_time: listing.end_time.timestamp_millis(),
        bids,
        active: listing.active,
    })
}

/// Current price, derived from the bid set
pub async fn get_current_price(store: &dyn AuctionStore, listing_id: i64) -> Result<i64> {
    info!("{:<12} --> current price id: {}", "Query", listing_id);
    store
        .get_listing(listing_id)
        .await?
        .map(|listing| listing.current_price())
        .ok_or_else(|| AppError::listing_not_found(listing_id))
}

/// Active listings for the public catalogue
pub async fn get_active_listings(store: &dyn AuctionStore) -> Result<Vec<ListingSummary>> {
    info!("{:<12} --> active listings", "Query");
    let listings = store.get_listings(false).await?;
    Ok(listings.into_iter().map(ListingSummary::from).collect())
}

/// Every listing, for administrators
pub async fn get_admin_listings(store: &dyn AuctionStore) -> Result<Vec<AdminListingView>> {
    info!("{:<12} --> all listings", "Query");
    let listings = store.get_listings(true).await?;
    Ok(listings.into_iter().map(AdminListingView::from).collect())
}

/// Categories
pub async fn get_categories(store: &dyn AuctionStore) -> Result<Vec<Category>> {
    info!("{:<12} --> categories", "Query");
    store.get_categories().await
}

// endregion: --- Query Handlers

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction_store::InMemoryAuctionStore;
    use crate::bidding::model::{NewBid, NewListing};
    use crate::bidding::rules::BidPolicy;
    use chrono::{Duration, Utc};

    async fn seeded_store() -> (InMemoryAuctionStore, i64) {
        let store = InMemoryAuctionStore::new();
        let id = store
            .create_listing(NewListing {
                title: "Vase".to_string(),
                description: "Gallé".to_string(),
                starting_price: 300,
                end_time: Utc::now() + Duration::days(1),
                category_id: None,
                images: vec!["vase.jpg".to_string()],
            })
            .await
            .unwrap();
        for (amount, anonymous) in [(310, false), (400, true)] {
            store
                .place_bid(
                    NewBid {
                        listing_id: id,
                        bidder_first_name: "Louis".to_string(),
                        bidder_last_name: "Pasteur".to_string(),
                        phone_number: "0700000000".to_string(),
                        amount,
                        is_anonymous: anonymous,
                    },
                    BidPolicy::default(),
                )
                .await
                .unwrap();
        }
        (store, id)
    }

    #[tokio::test]
    async fn public_snapshot_masks_anonymous_bids() {
        let (store, id) = seeded_store().await;
        let snapshot = get_listing_snapshot(&store, id)
            .await
            .unwrap();

        assert_eq!(snapshot.current_price, 400);
        assert_eq!(snapshot.category, "Autres");
        assert_eq!(snapshot.bids[0].bidder_name, "Anonyme");
        assert_eq!(snapshot.bids[0].phone_number, "");
        assert_eq!(snapshot.bids[1].bidder_name, "Louis Pasteur");
        assert_eq!(snapshot.bids[1].phone_number, "0700000000");
    }

    #[tokio::test]
    async fn repeated_price_reads_agree() {
        let (store, id) = seeded_store().await;
        let first = get_current_price(&store, id).await.unwrap();
        let second = get_current_price(&store, id).await.unwrap();
        assert_eq!(first, 400);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn catalogue_carries_counts_without_bids() {
        let (store, _) = seeded_store().await;
        let listings = get_active_listings(&store).await.unwrap();
        assert_eq!(listings.len(), 1);
        assert!(listings[0].bids.is_empty());
        assert_eq!(listings[0].bids_count, 2);
        assert_eq!(listings[0].current_price, 400);

        let admin = get_admin_listings(&store).await.unwrap();
        assert_eq!(admin[0].bids_count, 2);
        assert_eq!(admin[0].category_id, None);
    }

    #[tokio::test]
    async fn missing_listing_is_not_found() {
        let store = InMemoryAuctionStore::new();
        assert!(matches!(
            get_listing_snapshot(&store, 1).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            get_current_price(&store, 1).await,
            Err(AppError::NotFound(_))
        ));
    }
}
