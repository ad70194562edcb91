// Columns shared by every listing read. Price aggregates come from the bids table.
macro_rules! listing_select {
    () => {
        r#"
    SELECT l.id, l.title, l.description, l.starting_price, l.end_time, l.active,
           l.category_id, c.name AS category_name,
           ARRAY(
               SELECT i.image_url FROM listing_images i
               WHERE i.listing_id = l.id
               ORDER BY i.display_order, i.id
           ) AS images,
           (SELECT MAX(b.amount) FROM bids b WHERE b.listing_id = l.id) AS highest_bid,
           (SELECT COUNT(*) FROM bids b WHERE b.listing_id = l.id) AS bids_count,
           l.created_at
    FROM listings l
    LEFT JOIN categories c ON l.category_id = c.id
"#
    };
}

/// Single listing
pub const GET_LISTING: &str = concat!(listing_select!(), "WHERE l.id = $1");

/// Active listings, newest first
pub const GET_ACTIVE_LISTINGS: &str = concat!(
    listing_select!(),
    "WHERE l.active = TRUE ORDER BY l.created_at DESC, l.id DESC"
);

/// Every listing, including inactive ones
pub const GET_ALL_LISTINGS: &str =
    concat!(listing_select!(), "ORDER BY l.created_at DESC, l.id DESC");

/// Row lock on the listing; serialises bid commits per listing.
pub const LOCK_LISTING_FOR_BID: &str =
    "SELECT id, starting_price, end_time, active FROM listings WHERE id = $1 FOR UPDATE";

/// Highest bid
pub const GET_HIGHEST_BID: &str = "SELECT MAX(amount) FROM bids WHERE listing_id = $1";

/// Bid insert
pub const INSERT_BID: &str = r#"
    INSERT INTO bids (listing_id, bidder_first_name, bidder_last_name, phone_number, amount, is_anonymous)
    VALUES ($1, $2, $3, $4, $5, $6)
    RETURNING id, listing_id, bidder_first_name, bidder_last_name, phone_number, amount, is_anonymous, created_at
"#;

/// Bid history in display order
pub const GET_LISTING_BIDS: &str = r#"
    SELECT id, listing_id, bidder_first_name, bidder_last_name, phone_number, amount, is_anonymous, created_at
    FROM bids
    WHERE listing_id = $1
    ORDER BY amount DESC, created_at DESC, id DESC
"#;

/// Listing insert
pub const INSERT_LISTING: &str = r#"
    INSERT INTO listings (title, description, starting_price, end_time, category_id)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id
"#;

/// Listing update (starting price is not editable)
pub const UPDATE_LISTING: &str = r#"
    UPDATE listings
    SET title = $1, description = $2, end_time = $3, category_id = $4, active = $5, updated_at = NOW()
    WHERE id = $6
"#;

/// Listing delete; images and bids cascade
pub const DELETE_LISTING: &str = "DELETE FROM listings WHERE id = $1";

/// Image insert
pub const INSERT_LISTING_IMAGE: &str =
    "INSERT INTO listing_images (listing_id, image_url, display_order) VALUES ($1, $2, $3)";

/// Image reset
pub const DELETE_LISTING_IMAGES: &str = "DELETE FROM listing_images WHERE listing_id = $1";

/// Categories by name
pub const GET_CATEGORIES: &str = "SELECT id, name, created_at FROM categories ORDER BY name";

/// Category insert
pub const INSERT_CATEGORY: &str =
    "INSERT INTO categories (name) VALUES ($1) RETURNING id, name, created_at";
