// region:    --- Imports
use crate::admin::commands::{
    handle_create_category, handle_create_listing, handle_delete_listing, handle_update_listing,
    CreateCategoryRequest, CreateListingRequest, UpdateListingRequest,
};
use crate::auction_store::SharedAuctionStore;
use crate::bidding::commands::{handle_place_bid, PlaceBidCommand, SubmitBidRequest};
use crate::bidding::model::Category;
use crate::bidding::rules::BidPolicy;
use crate::error::{Result, ValidationError};
use crate::query::handlers as query;
use crate::query::views::{AdminListingView, ListingSnapshot, ListingSummary};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

// endregion: --- Imports

/// Shared by every handler; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedAuctionStore,
    pub policy: BidPolicy,
}

static PHONE_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0\d{9}$").expect("phone number regex should compile"));

pub fn validate_phone_number(phone_number: &str) -> std::result::Result<(), ValidationError> {
    if PHONE_NUMBER_PATTERN.is_match(phone_number.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhoneNumber)
    }
}

/// Unwrap a JSON body, turning extractor rejections into validation errors.
fn json_body<T>(
    payload: std::result::Result<Json<T>, JsonRejection>,
) -> std::result::Result<T, ValidationError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ValidationError::MalformedBody(rejection.body_text()))
}

// region:    --- Router
pub fn routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/products", get(handle_get_products))
        .route("/products/:id", get(handle_get_product))
        .route("/products/:id/bids", post(handle_bid))
        .route(
            "/admin/products",
            get(handle_get_admin_products).post(handle_create_product),
        )
        .route(
            "/admin/products/:id",
            put(handle_update_product).delete(handle_delete_product),
        )
        .route("/admin/categories", post(handle_create_category_route))
        .route("/categories", get(handle_get_categories));

    Router::new()
        .route("/health", get(handle_health))
        .nest("/api", api)
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 20))
        .with_state(state)
}
// endregion: --- Router

// region:    --- Command Handlers

/// Place a bid
pub async fn handle_bid(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
    payload: std::result::Result<Json<SubmitBidRequest>, JsonRejection>,
) -> Result<Json<ListingSnapshot>> {
    info!("{:<12} --> bid request on listing {}", "Handler", listing_id);
    let cmd = PlaceBidCommand::from_request(listing_id, json_body(payload)?)?;
    validate_phone_number(&cmd.phone_number)?;

    let snapshot = handle_place_bid(cmd, state.store.as_ref(), state.policy).await?;
    Ok(Json(snapshot))
}

/// Create a listing
pub async fn handle_create_product(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateListingRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    info!("{:<12} --> create listing", "Handler");
    let id = handle_create_listing(json_body(payload)?, state.store.as_ref()).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "message": "Product created successfully" })),
    ))
}

/// Update a listing
pub async fn handle_update_product(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
    payload: std::result::Result<Json<UpdateListingRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    info!("{:<12} --> update listing {}", "Handler", listing_id);
    handle_update_listing(listing_id, json_body(payload)?, state.store.as_ref()).await?;
    Ok(Json(json!({ "message": "Product updated successfully" })))
}

/// Delete a listing
pub async fn handle_delete_product(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
) -> Result<impl IntoResponse> {
    info!("{:<12} --> delete listing {}", "Handler", listing_id);
    handle_delete_listing(listing_id, state.store.as_ref()).await?;
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

/// Create a category
pub async fn handle_create_category_route(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    info!("{:<12} --> create category", "Handler");
    let category = handle_create_category(json_body(payload)?, state.store.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

pub async fn handle_health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Active listings
pub async fn handle_get_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ListingSummary>>> {
    info!("{:<12} --> active listings", "Handler");
    Ok(Json(query::get_active_listings(state.store.as_ref()).await?))
}

/// Listing with masked bid history
pub async fn handle_get_product(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
) -> Result<Json<ListingSnapshot>> {
    info!("{:<12} --> listing id: {}", "Handler", listing_id);
    let snapshot = query::get_listing_snapshot(state.store.as_ref(), listing_id).await?;
    Ok(Json(snapshot))
}

/// Every listing, including inactive
pub async fn handle_get_admin_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminListingView>>> {
    info!("{:<12} --> all listings", "Handler");
    Ok(Json(query::get_admin_listings(state.store.as_ref()).await?))
}

/// Categories
pub async fn handle_get_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>> {
    info!("{:<12} --> categories", "Handler");
    Ok(Json(query::get_categories(state.store.as_ref()).await?))
}

// endregion: --- Query Handlers

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_number_must_be_zero_and_nine_digits() {
        assert!(validate_phone_number("0612345678").is_ok());
        assert!(validate_phone_number(" 0612345678 ").is_ok());
        assert_eq!(
            validate_phone_number("612345678"),
            Err(ValidationError::InvalidPhoneNumber)
        );
        assert_eq!(
            validate_phone_number("06123456789"),
            Err(ValidationError::InvalidPhoneNumber)
        );
        assert_eq!(
            validate_phone_number("06 12 34 56 78"),
            Err(ValidationError::InvalidPhoneNumber)
        );
    }
}
