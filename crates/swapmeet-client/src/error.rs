use std::fmt;

use thiserror::Error;

/// One rejected form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every field problem found in a single validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// First message recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Failure of any client-core operation. `Display` is the text shown to the
/// user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error(
        "Image is too large ({size} bytes). Please select an image under {}MB.",
        .limit / (1024 * 1024)
    )]
    OversizedInput { size: u64, limit: u64 },

    #[error("Image size is too large. Please use a smaller image or lower quality.")]
    ImageTooLarge,

    #[error("Could not read image: {0}")]
    Decode(String),

    #[error("Could not encode image: {0}")]
    Encode(String),

    #[error("Could not fetch image: {0}")]
    Fetch(String),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),
}

impl MarketError {
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MarketError::NotFound(_))
    }
}

impl From<ValidationErrors> for MarketError {
    fn from(errors: ValidationErrors) -> Self {
        MarketError::Validation(errors)
    }
}

impl From<reqwest::Error> for MarketError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            MarketError::Transport("The server took too long to respond".into())
        } else if e.is_connect() {
            MarketError::Transport("Could not reach the server".into())
        } else if e.is_decode() {
            MarketError::Transport(format!("Unexpected response from the server: {}", e))
        } else {
            MarketError::Transport(format!("Request failed: {}", e))
        }
    }
}
