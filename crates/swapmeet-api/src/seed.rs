use anyhow::Result;
use chrono::{Duration, SecondsFormat, Utc};
use tracing::info;
use uuid::Uuid;

use swapmeet_db::Database;
use swapmeet_db::models::NewProductRow;

use crate::auth::hash_password;

const ADMIN_USERNAME: &str = "admin";
const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin123";

/// (title, description, category, condition, image)
const DEFAULT_PRODUCTS: [(&str, &str, &str, &str, &str); 3] = [
    (
        "iPhone 13",
        "Like new iPhone 13 128GB in midnight black",
        "Electronics",
        "Like New",
        "https://images.unsplash.com/photo-1592286927505-1def25115558?auto=format&fit=crop&w=800&q=80",
    ),
    (
        "Nike Air Max",
        "Size 10 Nike Air Max, worn only a few times",
        "Fashion",
        "Good",
        "https://images.unsplash.com/photo-1542291026-7eec264c27ff?auto=format&fit=crop&w=800&q=80",
    ),
    (
        "PlayStation 5",
        "PS5 with two controllers and 3 games",
        "Gaming",
        "New",
        "https://images.unsplash.com/photo-1606813907291-d86efa9b94db?auto=format&fit=crop&w=800&q=80",
    ),
];

/// Populate an empty catalog with the default listings, owned by an
/// `admin` account that is created if missing. Returns how many products
/// were inserted (0 when the catalog already had entries).
pub fn seed_defaults(db: &Database) -> Result<usize> {
    if db.count_products()? > 0 {
        return Ok(0);
    }

    let admin_id = match db.get_user_by_email(ADMIN_EMAIL)? {
        Some(user) => user.id,
        None => {
            let id = Uuid::new_v4().to_string();
            db.create_user(&id, ADMIN_USERNAME, ADMIN_EMAIL, &hash_password(ADMIN_PASSWORD)?)?;
            info!("Created default user '{}'", ADMIN_USERNAME);
            id
        }
    };

    // Staggered timestamps keep the listing order stable: first entry oldest.
    let base = Utc::now();
    for (i, (title, description, category, condition, image)) in DEFAULT_PRODUCTS.iter().enumerate() {
        let created_at = base + Duration::milliseconds(i as i64);
        db.insert_product(&NewProductRow {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            condition: condition.to_string(),
            price: 0.0,
            image_url: image.to_string(),
            owner_id: admin_id.clone(),
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        })?;
    }

    info!("Default products added successfully");
    Ok(DEFAULT_PRODUCTS.len())
}
