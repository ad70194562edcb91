/// Listing administration
/// 1. create listing
/// 2. update listing
/// 3. delete listing
/// 4. create category
// region:    --- Imports
use crate::auction_store::AuctionStore;
use crate::bidding::commands::parse_amount;
use crate::bidding::model::{Category, ListingUpdate, NewListing};
use crate::error::{Result, ValidationError};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
// endregion: --- Imports

// region:    --- Requests
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starting_price: Option<Value>,
    /// RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (UTC) or epoch milliseconds.
    pub end_time: Option<Value>,
    pub category_id: Option<i64>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub end_time: Option<Value>,
    pub category_id: Option<i64>,
    pub active: Option<bool>,
    /// Replaces every image when present.
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
}
// endregion: --- Requests

// region:    --- Commands
/// 1. create listing
pub async fn handle_create_listing(
    request: CreateListingRequest,
    store: &dyn AuctionStore,
) -> Result<i64> {
    let title = required_text(request.title)?;
    let description = required_text(request.description)?;
    if request.starting_price.is_none() || request.end_time.is_none() {
        return Err(ValidationError::MissingFields.into());
    }
    let starting_price = parse_amount(request.starting_price.as_ref()).map_err(|e| match e {
        ValidationError::MissingFields => e,
        _ => ValidationError::InvalidListing(
            "startingPrice must be a positive whole number".to_string(),
        ),
    })?;
    let end_time = parse_end_time(request.end_time.as_ref())?;

    let listing_id = store
        .create_listing(NewListing {
            title,
            description,
            starting_price,
            end_time,
            category_id: request.category_id,
            images: clean_images(request.images.unwrap_or_default()),
        })
        .await?;
    info!("{:<12} --> listing {} created", "Admin", listing_id);
    Ok(listing_id)
}

/// 2. update listing
pub async fn handle_update_listing(
    listing_id: i64,
    request: UpdateListingRequest,
    store: &dyn AuctionStore,
) -> Result<()> {
    let title = required_text(request.title)?;
    let description = required_text(request.description)?;
    let active = request.active.ok_or(ValidationError::MissingFields)?;
    let end_time = parse_end_time(request.end_time.as_ref())?;

    store
        .update_listing(
            listing_id,
            ListingUpdate {
                title,
                description,
                end_time,
                category_id: request.category_id,
                active,
                images: request.images.map(clean_images),
            },
        )
        .await?;
    info!("{:<12} --> listing {} updated", "Admin", listing_id);
    Ok(())
}

/// 3. delete listing
pub async fn handle_delete_listing(listing_id: i64, store: &dyn AuctionStore) -> Result<()> {
    store.delete_listing(listing_id).await?;
    info!("{:<12} --> listing {} deleted", "Admin", listing_id);
    Ok(())
}

/// 4. create category
pub async fn handle_create_category(
    request: CreateCategoryRequest,
    store: &dyn AuctionStore,
) -> Result<Category> {
    let name = required_text(request.name)?;
    let category = store.create_category(name).await?;
    info!("{:<12} --> category {} created", "Admin", category.id);
    Ok(category)
}
// endregion: --- Commands

// region:    --- Parsing
fn required_text(value: Option<String>) -> std::result::Result<String, ValidationError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingFields),
    }
}

fn clean_images(images: Vec<String>) -> Vec<String> {
    images
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

pub fn parse_end_time(value: Option<&Value>) -> std::result::Result<DateTime<Utc>, ValidationError> {
    let invalid = || ValidationError::InvalidListing("endTime is not a valid date".to_string());
    match value {
        None | Some(Value::Null) => Err(ValidationError::MissingFields),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .ok_or_else(invalid),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Err(ValidationError::MissingFields);
            }
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").map(|t| t.and_utc()))
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").map(|t| t.and_utc()))
                .map_err(|_| invalid())
        }
        Some(_) => Err(invalid()),
    }
}
// endregion: --- Parsing

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction_store::InMemoryAuctionStore;
    use crate::error::AppError;
    use serde_json::json;

    fn create_request() -> CreateListingRequest {
        CreateListingRequest {
            title: Some("Tableau".to_string()),
            description: Some("Huile sur toile".to_string()),
            starting_price: Some(json!("250")),
            end_time: Some(json!("2030-06-01T18:00:00Z")),
            category_id: None,
            images: Some(vec![" a.jpg ".to_string(), "".to_string(), "b.jpg".to_string()]),
        }
    }

    #[test]
    fn parses_supported_end_time_formats() {
        let expected = Utc.with_ymd_and_hms(2030, 6, 1, 18, 0, 0).unwrap();
        assert_eq!(parse_end_time(Some(&json!("2030-06-01T18:00:00Z"))), Ok(expected));
        assert_eq!(parse_end_time(Some(&json!("2030-06-01T20:00:00+02:00"))), Ok(expected));
        assert_eq!(parse_end_time(Some(&json!("2030-06-01T18:00"))), Ok(expected));
        assert_eq!(
            parse_end_time(Some(&json!(expected.timestamp_millis()))),
            Ok(expected)
        );
        assert_eq!(parse_end_time(None), Err(ValidationError::MissingFields));
        assert!(matches!(
            parse_end_time(Some(&json!("demain"))),
            Err(ValidationError::InvalidListing(_))
        ));
    }

    #[tokio::test]
    async fn create_update_delete_listing() {
        let store = InMemoryAuctionStore::new();
        let id = handle_create_listing(create_request(), &store).await.unwrap();

        let listing = store.get_listing(id).await.unwrap().unwrap();
        assert_eq!(listing.starting_price, 250);
        assert_eq!(listing.images, vec!["a.jpg", "b.jpg"]);
        assert!(listing.active);

        handle_update_listing(
            id,
            UpdateListingRequest {
                title: Some("Tableau restauré".to_string()),
                description: Some("Huile sur toile".to_string()),
                end_time: Some(json!("2030-07-01T18:00:00Z")),
                category_id: None,
                active: Some(false),
                images: Some(vec!["c.jpg".to_string()]),
            },
            &store,
        )
        .await
        .unwrap();

        let listing = store.get_listing(id).await.unwrap().unwrap();
        assert_eq!(listing.title, "Tableau restauré");
        assert_eq!(listing.images, vec!["c.jpg"]);
        assert_eq!(listing.starting_price, 250);
        assert!(!listing.active);

        handle_delete_listing(id, &store).await.unwrap();
        assert!(matches!(
            handle_delete_listing(id, &store).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn create_requires_fields() {
        let store = InMemoryAuctionStore::new();

        let mut request = create_request();
        request.title = Some("   ".to_string());
        assert!(matches!(
            handle_create_listing(request, &store).await,
            Err(AppError::Validation(ValidationError::MissingFields))
        ));

        let mut request = create_request();
        request.starting_price = Some(json!(-3));
        assert!(matches!(
            handle_create_listing(request, &store).await,
            Err(AppError::Validation(ValidationError::InvalidListing(_)))
        ));
    }

    #[tokio::test]
    async fn update_of_missing_listing_is_not_found() {
        let store = InMemoryAuctionStore::new();
        let result = handle_update_listing(
            77,
            UpdateListingRequest {
                title: Some("x".to_string()),
                description: Some("y".to_string()),
                end_time: Some(json!("2030-07-01T18:00:00Z")),
                category_id: None,
                active: Some(true),
                images: None,
            },
            &store,
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn category_name_is_required() {
        let store = InMemoryAuctionStore::new();
        assert!(matches!(
            handle_create_category(CreateCategoryRequest { name: None }, &store).await,
            Err(AppError::Validation(ValidationError::MissingFields))
        ));
        let category = handle_create_category(
            CreateCategoryRequest {
                name: Some(" Bijoux ".to_string()),
            },
            &store,
        )
        .await
        .unwrap();
        assert_eq!(category.name, "Bijoux");
    }
}
