use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use swapmeet_db::models::{NewProductRow, ProductRow};
use swapmeet_types::MAX_IMAGE_CHARS;
use swapmeet_types::api::{Claims, ProductListResponse, ProductResponse};
use swapmeet_types::models::{Condition, NewProduct, Owner, Product, ProductStatus};

use crate::{ApiError, AppState, blocking};

/// GET /api/products: every listing, newest first.
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let rows = blocking(move || Ok(state.db.list_products()?)).await?;

    let products = rows.into_iter().filter_map(row_to_product).collect();

    Ok(Json(ProductListResponse {
        success: true,
        products,
    }))
}

/// GET /api/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let row = blocking(move || Ok(state.db.get_product(&id)?)).await?;

    let product = row
        .and_then(row_to_product)
        .ok_or(ApiError::NotFound("Product"))?;

    Ok(Json(ProductResponse {
        success: true,
        product: Some(product),
    }))
}

/// POST /api/products. Requires a bearer token; the token subject becomes
/// the owner.
pub async fn create_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new) = payload?;
    let new = validate(new)?;

    let now = Utc::now();
    let row = NewProductRow {
        id: Uuid::new_v4().to_string(),
        title: new.title,
        description: new.description,
        category: new.category,
        condition: new.condition.label().to_string(),
        price: new.price,
        image_url: new.image_url,
        owner_id: claims.sub.to_string(),
        created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    let product = Product {
        id: row.id.clone(),
        title: row.title.clone(),
        description: row.description.clone(),
        category: row.category.clone(),
        condition: new.condition,
        price: row.price,
        image_url: row.image_url.clone(),
        owner: Owner {
            id: Some(claims.sub.to_string()),
            username: claims.username.clone(),
        },
        created_at: now,
        status: ProductStatus::Available,
    };

    blocking(move || Ok(state.db.insert_product(&row)?)).await?;

    info!(
        "Product {} '{}' listed by {}",
        product.id, product.title, claims.username
    );

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            success: true,
            product: Some(product),
        }),
    ))
}

/// Field checks matching the product document schema. Text fields are
/// trimmed; the condition enum is already enforced by deserialization.
fn validate(mut new: NewProduct) -> Result<NewProduct, ApiError> {
    new.title = new.title.trim().to_string();
    new.category = new.category.trim().to_string();

    if new.title.is_empty() {
        return Err(ApiError::Validation("Product title is required".into()));
    }
    if new.description.trim().is_empty() {
        return Err(ApiError::Validation("Product description is required".into()));
    }
    if new.category.is_empty() {
        return Err(ApiError::Validation("Product category is required".into()));
    }
    if new.image_url.is_empty() {
        return Err(ApiError::Validation("Product image is required".into()));
    }
    if !new.price.is_finite() || new.price < 0.0 {
        return Err(ApiError::Validation(
            "Price must be a valid positive number".into(),
        ));
    }
    if new.image_url.len() > MAX_IMAGE_CHARS {
        return Err(ApiError::PayloadTooLarge);
    }

    Ok(new)
}

fn row_to_product(row: ProductRow) -> Option<Product> {
    let condition = match row.condition.parse::<Condition>() {
        Ok(condition) => condition,
        Err(e) => {
            warn!("Skipping product '{}': {}", row.id, e);
            return None;
        }
    };

    let status = row.status.parse::<ProductStatus>().unwrap_or_else(|e| {
        warn!("Corrupt status on product '{}': {}", row.id, e);
        ProductStatus::default()
    });

    let created_at = row
        .created_at
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand may use SQLite's "YYYY-MM-DD HH:MM:SS".
            chrono::NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on product '{}': {}", row.created_at, row.id, e);
            DateTime::default()
        });

    Some(Product {
        id: row.id,
        title: row.title,
        description: row.description,
        category: row.category,
        condition,
        price: row.price,
        image_url: row.image_url,
        owner: Owner {
            id: Some(row.owner_id),
            username: row.owner_username,
        },
        created_at,
        status,
    })
}
