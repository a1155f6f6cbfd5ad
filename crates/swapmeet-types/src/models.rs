use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Condition labels accepted for a listing. The wire form is the label
/// itself ("Like New", not "LikeNew").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    New,
    #[serde(rename = "Like New")]
    LikeNew,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::New,
        Condition::LikeNew,
        Condition::Good,
        Condition::Fair,
        Condition::Poor,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::LikeNew => "Like New",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
            Condition::Poor => "Poor",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown condition '{0}'")]
pub struct UnknownCondition(pub String);

impl FromStr for Condition {
    type Err = UnknownCondition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Condition::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| UnknownCondition(s.to_string()))
    }
}

/// Server-side listing status. The client never transitions it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Available,
    Traded,
    Reserved,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Available => "available",
            ProductStatus::Traded => "traded",
            ProductStatus::Reserved => "reserved",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ProductStatus::Available),
            "traded" => Ok(ProductStatus::Traded),
            "reserved" => Ok(ProductStatus::Reserved),
            other => Err(format!("unknown product status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
}

/// A listed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: Condition,
    /// Missing or null prices read as 0.
    #[serde(default, deserialize_with = "price_or_zero")]
    pub price: f64,
    /// Either a `data:` URL produced by the image pipeline or a plain URL.
    pub image_url: String,
    pub owner: Owner,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: ProductStatus,
}

fn price_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// Body of `POST /api/products`: a product minus id, owner and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: Condition,
    #[serde(default, deserialize_with = "price_or_zero")]
    pub price: f64,
    pub image_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    #[default]
    Purchased,
}

/// A purchase recorded on the client. Product fields are copied by value
/// when the trade is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub price: f64,
    pub purchase_date: DateTime<Utc>,
    pub status: TradeStatus,
    pub image: String,
    pub description: String,
    pub category: String,
    pub condition: Condition,
    pub owner: Owner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_uses_display_labels_on_the_wire() {
        let json = serde_json::to_string(&Condition::LikeNew).unwrap();
        assert_eq!(json, "\"Like New\"");
        assert_eq!("Like New".parse::<Condition>().unwrap(), Condition::LikeNew);
        assert!("Mint".parse::<Condition>().is_err());
    }

    #[test]
    fn product_without_price_reads_as_zero() {
        let json = r#"{
            "_id": "p1",
            "title": "iPhone 13",
            "description": "Like new iPhone 13 128GB in midnight black",
            "category": "Electronics",
            "condition": "Like New",
            "imageUrl": "https://example.com/phone.jpg",
            "owner": { "_id": "u1", "username": "admin" },
            "createdAt": "2024-01-01T00:00:00Z"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, "p1");
        assert_eq!(product.price, 0.0);
        assert_eq!(product.status, ProductStatus::Available);
        assert_eq!(product.owner.id.as_deref(), Some("u1"));

        let with_null = json.replace("\"category\"", "\"price\": null, \"category\"");
        let product: Product = serde_json::from_str(&with_null).unwrap();
        assert_eq!(product.price, 0.0);
    }

    #[test]
    fn product_serializes_camel_case() {
        let product = Product {
            id: "p1".into(),
            title: "Nike Air Max".into(),
            description: "Size 10".into(),
            category: "Fashion".into(),
            condition: Condition::Good,
            price: 40.5,
            image_url: "data:image/jpeg;base64,AAAA".into(),
            owner: Owner { id: None, username: "sam".into() },
            created_at: Utc::now(),
            status: ProductStatus::Available,
        };
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["imageUrl"], "data:image/jpeg;base64,AAAA");
        assert_eq!(value["status"], "available");
        assert!(value["owner"].get("id").is_none());
        assert!(value.get("createdAt").is_some());
    }
}
