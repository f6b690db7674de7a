// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GitHub OAuth and REST API client.
//!
//! Handles:
//! - Building the authorization URL
//! - Exchanging an authorization code for an access token
//! - Fetching the authenticated user's profile and email list

use crate::config::Config;
use crate::error::AppError;
use serde::Deserialize;
use std::time::Duration;

/// Outbound request timeout for every GitHub call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "MergeQuest-App";

/// Scope needed to read the user's (possibly private) email addresses.
pub const OAUTH_SCOPE: &str = "user:email";

/// GitHub API client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    oauth_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
}

impl GitHubClient {
    /// Create a new GitHub client from the OAuth app credentials in `config`.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            oauth_url: config.github_oauth_url.trim_end_matches('/').to_string(),
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
            client_id: config.github_client_id.clone(),
            client_secret: config.github_client_secret.clone(),
        })
    }

    /// Authorization URL the browser is sent to.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&redirect_uri={}&scope={}&response_type=code&state={}",
            self.oauth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(OAUTH_SCOPE),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for an access token.
    ///
    /// `redirect_uri` must be the one used to obtain the code; GitHub
    /// rejects a mismatch with an error body rather than an HTTP error.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, AppError> {
        let response = self
            .http
            .post(format!("{}/access_token", self.oauth_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Token exchange failed: {}", e)))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AppError::UpstreamUnavailable(format!(
                "Token exchange failed with status {}",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "GitHub token exchange rejected");
            return Err(AppError::TokenExchangeFailed);
        }

        let token: AccessTokenResponse = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to parse token response: {}", e))
        })?;

        match token.access_token.filter(|t| !t.is_empty()) {
            Some(access_token) => Ok(access_token),
            None => {
                tracing::warn!(
                    error = token.error.as_deref().unwrap_or("none"),
                    description = token.error_description.as_deref().unwrap_or(""),
                    "GitHub returned no access token"
                );
                Err(AppError::TokenExchangeFailed)
            }
        }
    }

    /// Get the authenticated user's profile.
    pub async fn get_user(&self, access_token: &str) -> Result<GitHubUser, AppError> {
        let url = format!("{}/user", self.api_url);
        self.get_json(&url, access_token).await
    }

    /// Get the authenticated user's email addresses.
    pub async fn get_emails(&self, access_token: &str) -> Result<Vec<GitHubEmail>, AppError> {
        let url = format!("{}/user/emails", self.api_url);
        self.get_json(&url, access_token).await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamUnavailable(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Unexpected response shape: {}", e)))
    }
}

/// Token endpoint response. GitHub reports failures in the body with 200.
#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Profile from `GET /user`. `id`, `login` and `avatar_url` are required.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub id: u64,
    pub login: String,
    pub avatar_url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl GitHubUser {
    /// Display name, falling back to the login handle.
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.login)
            .to_string()
    }
}

/// Entry from `GET /user/emails`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

/// Pick the primary address, else the public profile email.
pub fn select_email(emails: &[GitHubEmail], user: &GitHubUser) -> Option<String> {
    emails
        .iter()
        .find(|e| e.primary)
        .map(|e| e.email.clone())
        .or_else(|| user.email.clone())
        .filter(|e| !e.trim().is_empty())
}
