use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::{app_folder, parse_rfc3339};

pub const TOKEN_FILE_NAME: &str = "token.json";
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const REFRESH_TIMEOUT: u64 = 30;
// Refresh a bit before the real expiry to not start a transfer with a dying token
const EXPIRY_MARGIN_SECONDS: i64 = 60;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Not authenticated, please authenticate first")]
    NotAuthenticated,
    #[error("Credential file '{0}' is corrupted : {1}")]
    Corrupt(PathBuf, String),
    #[error("Unable to refresh access token : {0}")]
    Refresh(String),
    #[error("Unable to determine user home folder")]
    UnableToFindHomeUser,
    #[error("Credential file error : {0}")]
    Io(#[from] io::Error),
}

impl From<reqwest::Error> for CredentialError {
    fn from(error: reqwest::Error) -> Self {
        Self::Refresh(error.to_string())
    }
}

/// OAuth token, in the same layout as the one written by the browser flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
}

impl Token {
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        match &self.expiry {
            // Unparsable expiry is considered as expired to force a refresh
            Some(expiry) => match parse_rfc3339(expiry) {
                Some(expiry) => (expiry - now).num_seconds() < EXPIRY_MARGIN_SECONDS,
                None => true,
            },
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<i64>,
    token_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

pub trait Authenticator {
    fn is_authenticated(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn from_env() -> Result<Self, CredentialError> {
        let folder = app_folder().ok_or(CredentialError::UnableToFindHomeUser)?;
        Ok(Self::new(folder.join(TOKEN_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Token, CredentialError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(CredentialError::NotAuthenticated)
            }
            Err(error) => return Err(error.into()),
        };
        serde_json::from_str(&raw)
            .map_err(|error| CredentialError::Corrupt(self.path.clone(), error.to_string()))
    }

    pub fn save(&self, token: &Token) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(token)
            .map_err(|error| CredentialError::Corrupt(self.path.clone(), error.to_string()))?;
        fs::write(&self.path, raw)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        log::info!("Token saved into '{}'", self.path.display());
        Ok(())
    }

    /// Copy a token file produced elsewhere (by the browser flow) after checking it
    pub fn import(&self, source: &Path) -> Result<Token, CredentialError> {
        let token = CredentialStore::new(source.to_path_buf()).load()?;
        self.save(&token)?;
        Ok(token)
    }

    /// Current access token, refreshed (and persisted) when expired
    pub fn access_token(&self, oauth: Option<&OAuthClient>) -> Result<String, CredentialError> {
        let token = self.load()?;
        if !token.expired(Utc::now()) {
            return Ok(token.access_token);
        }

        let (Some(oauth), Some(refresh_token)) = (oauth, &token.refresh_token) else {
            log::warn!("Access token is expired and can't be refreshed");
            return Ok(token.access_token);
        };

        log::info!("Refresh expired access token");
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REFRESH_TIMEOUT))
            .build()?;
        let response = client
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("client_id", oauth.client_id.as_str()),
                ("client_secret", oauth.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()?;
        if !response.status().is_success() {
            return Err(CredentialError::Refresh(format!(
                "Token endpoint responded {} : '{}'",
                response.status(),
                response.text().unwrap_or_default()
            )));
        }
        let refreshed = response.json::<RefreshResponse>()?;
        let renewed = token.renewed(refreshed, Utc::now());
        self.save(&renewed)?;

        Ok(renewed.access_token)
    }
}

impl Token {
    fn renewed(&self, response: RefreshResponse, now: DateTime<Utc>) -> Token {
        Token {
            access_token: response.access_token,
            token_type: response.token_type.or_else(|| self.token_type.clone()),
            refresh_token: self.refresh_token.clone(),
            expiry: response.expires_in.map(|seconds| {
                (now + chrono::Duration::seconds(seconds))
                    .to_rfc3339_opts(SecondsFormat::Secs, true)
            }),
        }
    }
}

impl Authenticator for CredentialStore {
    fn is_authenticated(&self) -> bool {
        match self.load() {
            Ok(_) => true,
            Err(CredentialError::NotAuthenticated) => false,
            Err(error) => {
                log::error!("Unable to read credential : {}", error);
                false
            }
        }
    }
}
