//! services/api/src/adapters/userinfo.rs
//!
//! This module contains the adapter for the OAuth userinfo endpoint. It
//! implements the `IdentityService` port from the `core` crate: a bearer
//! token goes in, the caller's profile (including the hosted-domain claim)
//! comes out.

use async_trait::async_trait;
use recruit_core::domain::GoogleUser;
use recruit_core::ports::{IdentityService, PortError, PortResult};
use serde::Deserialize;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `IdentityService` port against the OAuth
/// userinfo endpoint.
#[derive(Clone)]
pub struct UserInfoAdapter {
    client: reqwest::Client,
    url: String,
}

impl UserInfoAdapter {
    /// Creates a new `UserInfoAdapter`.
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

/// The userinfo payload. Fields default to empty when a scope was not
/// granted; only the domain claim is structurally optional.
#[derive(Deserialize)]
struct UserInfoResponse {
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: String,
    hd: Option<String>,
}

//=========================================================================================
// `IdentityService` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityService for UserInfoAdapter {
    async fn user_info(&self, access_token: &str) -> PortResult<GoogleUser> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(PortError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!("userinfo: {status}: {body}")));
        }

        let info: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(GoogleUser {
            email: info.email,
            name: info.name,
            picture: info.picture,
            hd: info.hd,
        })
    }
}
