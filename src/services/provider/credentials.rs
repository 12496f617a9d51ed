//! OAuth access tokens for Google APIs, from the credential file named by
//! `GOOGLE_APPLICATION_CREDENTIALS`.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

const SCOPE: &str = "https://www.googleapis.com/auth/cloud-translation";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: u64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    ServiceAccount {
        client_email: String,
        private_key: String,
        #[serde(default = "default_token_uri")]
        token_uri: String,
    },
    AuthorizedUser {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl Credentials {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        serde_json::from_str(&data).map_err(|e| {
            SyncError::config(format!(
                "unrecognised credential file {}: {e}",
                path.display()
            ))
        })
    }

    pub fn access_token(&self, client: &Client) -> Result<String> {
        let resp = match self {
            Credentials::ServiceAccount { token_uri, .. } => {
                let assertion = self.assertion(now_secs())?;
                client
                    .post(token_uri)
                    .form(&[
                        ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                        ("assertion", assertion.as_str()),
                    ])
                    .send()
            }
            Credentials::AuthorizedUser {
                client_id,
                client_secret,
                refresh_token,
            } => client
                .post(DEFAULT_TOKEN_URI)
                .form(&[
                    ("grant_type", "refresh_token"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("refresh_token", refresh_token.as_str()),
                ])
                .send(),
        }
        .map_err(|e| SyncError::provider(format!("token request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| SyncError::provider(format!("token response unreadable: {e}")))?;
        if !status.is_success() {
            return Err(SyncError::provider(format!(
                "token exchange rejected: {}",
                super::google::extract_error_message(status, &text)
            )));
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| SyncError::provider(format!("invalid token response: {e}")))?;
        Ok(token.access_token)
    }

    /// Signed RS256 JWT for the service-account grant.
    fn assertion(&self, iat: u64) -> Result<String> {
        let Credentials::ServiceAccount {
            client_email,
            private_key,
            token_uri,
        } = self
        else {
            return Err(SyncError::config("assertion requires a service account"));
        };

        let claims = AssertionClaims {
            iss: client_email,
            scope: SCOPE,
            aud: token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
            .map_err(|e| SyncError::config(format!("invalid service account key: {e}")))?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| SyncError::config(format!("failed to sign assertion: {e}")))
    }
}

/// Resolves a bearer token: an explicit token wins, otherwise the credential file.
pub fn resolve_access_token(client: &Client) -> Result<String> {
    if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
        if !token.trim().is_empty() {
            return Ok(token.trim().to_string());
        }
    }

    let path = std::env::var_os(CREDENTIALS_ENV).ok_or_else(|| {
        SyncError::config(format!(
            "set {CREDENTIALS_ENV} to a credential file (or {ACCESS_TOKEN_ENV})"
        ))
    })?;

    Credentials::from_file(Path::new(&path))?.access_token(client)
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_account() {
        let creds: Credentials = serde_json::from_str(
            r#"{"type":"service_account","client_email":"bot@p.iam.gserviceaccount.com","private_key":"k","project_id":"p"}"#,
        )
        .unwrap();
        match creds {
            Credentials::ServiceAccount { token_uri, .. } => {
                assert_eq!(token_uri, DEFAULT_TOKEN_URI)
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_authorized_user() {
        let creds: Credentials = serde_json::from_str(
            r#"{"type":"authorized_user","client_id":"id","client_secret":"s","refresh_token":"r"}"#,
        )
        .unwrap();
        assert!(matches!(creds, Credentials::AuthorizedUser { .. }));
    }

    #[test]
    fn rejects_unknown_credential_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, r#"{"type":"external_account"}"#).unwrap();
        assert!(matches!(
            Credentials::from_file(&path),
            Err(SyncError::Configuration(_))
        ));
    }

    #[test]
    fn bad_private_key_is_a_configuration_error() {
        let creds = Credentials::ServiceAccount {
            client_email: "bot@example".into(),
            private_key: "not a pem".into(),
            token_uri: DEFAULT_TOKEN_URI.into(),
        };
        assert!(matches!(
            creds.assertion(1_700_000_000),
            Err(SyncError::Configuration(_))
        ));
    }
}
