// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything a deployment can vary (GitHub credentials, session secret,
//! frontend origin, TLS/production behavior) lives here and is handed to
//! the router explicitly.

use std::env;

pub const DEFAULT_GITHUB_OAUTH_URL: &str = "https://github.com/login/oauth";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// GitHub OAuth app client ID (public)
    pub github_client_id: String,
    /// Frontend URL for OAuth redirects and CORS
    pub frontend_url: String,
    /// Externally visible base URL of this API, if the Host header can't be trusted
    pub public_url: Option<String>,
    /// Redirect URI registered for the popup flow (frontend callback page)
    pub popup_redirect_uri: String,
    /// GCP project ID; `None` selects the in-process store
    pub gcp_project_id: Option<String>,
    /// Server port
    pub port: u16,
    /// Production deployment (secure cookies, no error details)
    pub production: bool,
    /// GitHub OAuth endpoint base (authorize + access_token)
    pub github_oauth_url: String,
    /// GitHub REST API base
    pub github_api_url: String,

    // --- Secrets ---
    /// GitHub OAuth client secret
    pub github_client_secret: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            github_client_id: "test_client_id".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            public_url: None,
            popup_redirect_uri: "http://localhost:3000/oauth-callback".to_string(),
            gcp_project_id: None,
            port: 4000,
            production: false,
            github_oauth_url: DEFAULT_GITHUB_OAUTH_URL.to_string(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            github_client_secret: "test_secret".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let frontend_url = env::var("FRONTEND_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let popup_redirect_uri = env::var("GITHUB_POPUP_REDIRECT_URI")
            .unwrap_or_else(|_| format!("{}/oauth-callback", frontend_url));

        Ok(Self {
            github_client_id: required("GITHUB_CLIENT_ID")?,
            public_url: optional("PUBLIC_URL").map(|v| v.trim_end_matches('/').to_string()),
            popup_redirect_uri,
            gcp_project_id: optional("GCP_PROJECT_ID"),
            port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT"))?,
            production: env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            github_oauth_url: optional("GITHUB_OAUTH_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_OAUTH_URL.to_string()),
            github_api_url: optional("GITHUB_API_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            frontend_url,

            github_client_secret: required("GITHUB_CLIENT_SECRET")?,
            jwt_signing_key: required("JWT_SECRET")?.into_bytes(),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
