use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;

use swapmeet_types::api::{AuthResponse, LoginRequest, RegisterRequest};

use crate::{MarketApi, MarketError};

/// The signed-in account and its bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub token: String,
}

impl From<AuthResponse> for AuthUser {
    fn from(resp: AuthResponse) -> Self {
        Self {
            id: resp.user.id,
            username: resp.user.username,
            email: resp.user.email,
            token: resp.token,
        }
    }
}

/// Who is using the client right now, if anyone.
#[derive(Debug, Default)]
pub struct Session {
    user: Mutex<Option<AuthUser>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume with a user whose token was obtained earlier.
    pub fn signed_in(user: AuthUser) -> Self {
        Self {
            user: Mutex::new(Some(user)),
        }
    }

    pub async fn login<A: MarketApi + ?Sized>(
        &self,
        api: &A,
        username: &str,
        password: &str,
    ) -> Result<AuthUser, MarketError> {
        let resp = api
            .login(&LoginRequest {
                username: username.trim().to_string(),
                password: password.to_string(),
            })
            .await?;
        Ok(self.store(resp))
    }

    pub async fn register<A: MarketApi + ?Sized>(
        &self,
        api: &A,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, MarketError> {
        let resp = api
            .register(&RegisterRequest {
                username: username.trim().to_string(),
                email: email.trim().to_string(),
                password: password.to_string(),
            })
            .await?;
        Ok(self.store(resp))
    }

    pub fn logout(&self) {
        if let Some(user) = self.lock().take() {
            info!("User '{}' signed out", user.username);
        }
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.lock().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.lock().as_ref().map(|u| u.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }

    fn store(&self, resp: AuthResponse) -> AuthUser {
        let user = AuthUser::from(resp);
        info!("User '{}' signed in", user.username);
        *self.lock() = Some(user.clone());
        user
    }

    fn lock(&self) -> MutexGuard<'_, Option<AuthUser>> {
        self.user.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
