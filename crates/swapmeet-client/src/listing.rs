use swapmeet_types::models::{Condition, NewProduct};

use crate::{MarketError, ValidationErrors};

const MIN_TITLE_CHARS: usize = 3;
const MIN_DESCRIPTION_CHARS: usize = 10;

/// The listing form as the user typed it. Every field is raw text; `image`
/// holds whatever the image pipeline produced at ingest time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub price: String,
    pub category: String,
    pub condition: String,
    pub image: String,
}

impl ListingDraft {
    /// Check every field and collect all problems at once. On success the
    /// draft becomes the request body, with `image_url` still unprocessed.
    pub fn validate(&self) -> Result<NewProduct, MarketError> {
        let mut errors = ValidationErrors::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.push("title", "Title is required");
        } else if title.chars().count() < MIN_TITLE_CHARS {
            errors.push("title", "Title must be at least 3 characters");
        }

        let price = self.price.trim();
        if price.is_empty() {
            errors.push("price", "Price is required");
        } else if !matches!(price.parse::<f64>(), Ok(p) if p.is_finite() && p >= 0.0) {
            errors.push("price", "Price must be a valid positive number");
        }

        let category = self.category.trim();
        if category.is_empty() {
            errors.push("category", "Category is required");
        }

        let condition = if self.condition.trim().is_empty() {
            errors.push("condition", "Condition is required");
            None
        } else {
            match self.condition.parse::<Condition>() {
                Ok(condition) => Some(condition),
                Err(e) => {
                    errors.push("condition", format!("Condition is invalid: {}", e));
                    None
                }
            }
        };

        let description = self.description.trim();
        if description.is_empty() {
            errors.push("description", "Description is required");
        } else if description.chars().count() < MIN_DESCRIPTION_CHARS {
            errors.push("description", "Description must be at least 10 characters");
        }

        if self.image.trim().is_empty() {
            errors.push("image", "Image is required");
        }

        match condition {
            Some(condition) if errors.is_empty() => Ok(NewProduct {
                title: title.to_string(),
                description: description.to_string(),
                category: category.to_string(),
                condition,
                price: parse_price(price),
                image_url: self.image.clone(),
            }),
            _ => Err(MarketError::Validation(errors)),
        }
    }
}

/// Numeric value of a price field; anything unparsable counts as 0.
pub fn parse_price(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ListingDraft {
        ListingDraft {
            title: "Road bike".into(),
            description: "Aluminium frame, 56cm, recently serviced".into(),
            price: "12.50".into(),
            category: "Sports".into(),
            condition: "Like New".into(),
            image: "data:image/jpeg;base64,AAAA".into(),
        }
    }

    fn field_errors(draft: &ListingDraft) -> ValidationErrors {
        match draft.validate() {
            Err(MarketError::Validation(errors)) => errors,
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn valid_draft_becomes_a_request() {
        let product = draft().validate().unwrap();
        assert_eq!(product.price, 12.5);
        assert_eq!(product.condition, Condition::LikeNew);
        assert_eq!(product.title, "Road bike");
    }

    #[test]
    fn every_problem_is_reported() {
        let errors = field_errors(&ListingDraft::default());
        for field in ["title", "price", "category", "condition", "description", "image"] {
            assert!(errors.get(field).is_some(), "no error for {}", field);
        }
        assert_eq!(errors.len(), 6);
    }

    #[test]
    fn short_fields_are_rejected() {
        let errors = field_errors(&ListingDraft {
            title: "TV".into(),
            description: "Works".into(),
            ..draft()
        });
        assert_eq!(errors.get("title"), Some("Title must be at least 3 characters"));
        assert_eq!(
            errors.get("description"),
            Some("Description must be at least 10 characters")
        );
    }

    #[test]
    fn price_must_be_a_non_negative_number() {
        for bad in ["-1", "12.50abc", "NaN", "inf"] {
            let errors = field_errors(&ListingDraft {
                price: bad.into(),
                ..draft()
            });
            assert!(errors.get("price").is_some(), "accepted {}", bad);
        }
        let free = ListingDraft {
            price: "0".into(),
            ..draft()
        };
        assert_eq!(free.validate().unwrap().price, 0.0);
    }

    #[test]
    fn unknown_condition_is_rejected() {
        let errors = field_errors(&ListingDraft {
            condition: "Mint".into(),
            ..draft()
        });
        assert_eq!(errors.len(), 1);
        assert!(errors.get("condition").unwrap().contains("Mint"));
    }

    #[test]
    fn parse_price_falls_back_to_zero() {
        assert_eq!(parse_price(" 7.25 "), 7.25);
        assert_eq!(parse_price("free"), 0.0);
        assert_eq!(parse_price(""), 0.0);
    }
}
