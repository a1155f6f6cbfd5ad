/// Database row types, mapped directly from SQLite rows and kept apart from
/// the swapmeet-types wire models.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

/// A product joined with its owner's username.
pub struct ProductRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: String,
    pub price: f64,
    pub image_url: String,
    pub owner_id: String,
    pub owner_username: String,
    pub status: String,
    pub created_at: String,
}

/// Values for a new `products` row. `created_at` is RFC 3339.
pub struct NewProductRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: String,
    pub price: f64,
    pub image_url: String,
    pub owner_id: String,
    pub created_at: String,
}
