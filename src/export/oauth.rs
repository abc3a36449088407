//! OAuth 2 implicit-grant helpers for the export connect step.

use reqwest::Url;
use thiserror::Error;

pub const DROPBOX_AUTHORIZE_URL: &str = "https://www.dropbox.com/oauth2/authorize";
pub const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OAuthError {
    #[error("invalid authorize url '{0}'")]
    BadUrl(String),
    #[error("authorization denied: {0}")]
    Denied(String),
    #[error("redirect carries no access_token")]
    MissingToken,
    #[error("redirect state does not match the pending request")]
    StateMismatch,
    #[error("no connect request is pending")]
    NotConnecting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitGrant {
    pub authorize_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: Option<String>,
}

impl ImplicitGrant {
    pub fn dropbox(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            authorize_url: DROPBOX_AUTHORIZE_URL.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scope: None,
        }
    }

    pub fn google_drive(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            authorize_url: GOOGLE_AUTHORIZE_URL.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scope: Some(DRIVE_FILE_SCOPE.into()),
        }
    }

    /// URL the player opens to grant access; `state` is echoed back in the
    /// redirect fragment.
    pub fn authorize_url(&self, state: &str) -> Result<Url, OAuthError> {
        let mut url = Url::parse(&self.authorize_url)
            .map_err(|_| OAuthError::BadUrl(self.authorize_url.clone()))?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("response_type", "token");
            q.append_pair("client_id", &self.client_id);
            q.append_pair("redirect_uri", &self.redirect_uri);
            q.append_pair("state", state);
            if let Some(scope) = &self.scope {
                q.append_pair("scope", scope);
            }
        }
        Ok(url)
    }
}

/// Extract the access token from an implicit-grant redirect.
///
/// Accepts the full redirect URL or just its fragment.
pub fn parse_redirect(redirect: &str, expected_state: &str) -> Result<String, OAuthError> {
    let fragment = match redirect.split_once('#') {
        Some((_, frag)) => frag,
        None => redirect.trim_start_matches('#'),
    };

    let mut parsed = Url::parse("http://localhost/").map_err(|_| OAuthError::MissingToken)?;
    parsed.set_query(Some(fragment.trim()));

    let mut token = None;
    let mut state = None;
    let mut error = None;
    for (k, v) in parsed.query_pairs() {
        match k.as_ref() {
            "access_token" => token = Some(v.into_owned()),
            "state" => state = Some(v.into_owned()),
            "error_description" => error = Some(v.into_owned()),
            "error" if error.is_none() => error = Some(v.into_owned()),
            _ => {}
        }
    }

    if let Some(e) = error {
        return Err(OAuthError::Denied(e));
    }
    if state.as_deref() != Some(expected_state) {
        return Err(OAuthError::StateMismatch);
    }
    token.filter(|t| !t.is_empty()).ok_or(OAuthError::MissingToken)
}
