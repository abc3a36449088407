//! Connection state for one upload backend.

use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Url;

use crate::engine::models::{ExportFormat, LogEvent};
use crate::export::backend::{UploadBackend, UploadError, UploadFile};
use crate::export::format::prepare_upload;
use crate::export::oauth::{parse_redirect, ImplicitGrant, OAuthError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    /// Waiting for the implicit-grant redirect carrying `state`.
    Connecting { state: String },
    Connected,
    Exporting,
}

pub struct ExportLink {
    backend: Box<dyn UploadBackend>,
    format: ExportFormat,
    grant: Option<ImplicitGrant>,
    token: Option<String>,
    state: LinkState,
}

impl ExportLink {
    /// Backends that need no token (the relay) start out connected.
    pub fn new(backend: Box<dyn UploadBackend>, format: ExportFormat) -> Self {
        let state = if backend.needs_token() {
            LinkState::Disconnected
        } else {
            LinkState::Connected
        };
        Self {
            backend,
            format,
            grant: None,
            token: None,
            state,
        }
    }

    /// Use a long-lived token instead of the connect step.
    pub fn with_static_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self.state = LinkState::Connected;
        self
    }

    pub fn with_oauth(mut self, grant: ImplicitGrant) -> Self {
        self.grant = Some(grant);
        self
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// Start the OAuth flow: returns the URL the player must open.
    pub fn begin_connect<R: Rng>(&mut self, rng: &mut R) -> Result<Url, UploadError> {
        if self.state == LinkState::Exporting {
            return Err(UploadError::Busy);
        }
        let grant = self
            .grant
            .as_ref()
            .ok_or_else(|| UploadError::NoAuthFlow(self.backend.name().to_string()))?;
        let csrf: String = (0..24).map(|_| rng.sample(Alphanumeric) as char).collect();
        let url = grant.authorize_url(&csrf)?;
        self.state = LinkState::Connecting { state: csrf };
        Ok(url)
    }

    /// Finish the OAuth flow with the redirect URL (or its fragment).
    pub fn complete_connect(&mut self, redirect: &str) -> Result<(), UploadError> {
        let expected = match &self.state {
            LinkState::Connecting { state } => state.clone(),
            _ => return Err(OAuthError::NotConnecting.into()),
        };
        match parse_redirect(redirect, &expected) {
            Ok(token) => {
                self.token = Some(token);
                self.state = LinkState::Connected;
                tracing::info!(backend = self.backend.name(), "export link connected");
                Ok(())
            }
            Err(e) => {
                self.state = LinkState::Disconnected;
                tracing::warn!(backend = self.backend.name(), error = %e, "connect failed");
                Err(e.into())
            }
        }
    }

    pub fn disconnect(&mut self) {
        self.token = None;
        self.state = if self.backend.needs_token() {
            LinkState::Disconnected
        } else {
            LinkState::Connected
        };
    }

    /// One upload attempt. A 401 drops the token and disconnects.
    pub async fn upload(&mut self, file: &UploadFile) -> Result<(), UploadError> {
        match self.state {
            LinkState::Connected => {}
            LinkState::Exporting => return Err(UploadError::Busy),
            _ => return Err(UploadError::NotConnected),
        }

        self.state = LinkState::Exporting;
        let result = self.backend.upload(file, self.token.as_deref()).await;
        match &result {
            Ok(()) => {
                self.state = LinkState::Connected;
                tracing::info!(backend = self.backend.name(), file = %file.name, "upload complete");
            }
            Err(UploadError::Unauthorized) => {
                self.token = None;
                self.state = LinkState::Disconnected;
                tracing::warn!(backend = self.backend.name(), "authorization expired, disconnected");
            }
            Err(e) => {
                self.state = LinkState::Connected;
                tracing::warn!(backend = self.backend.name(), error = %e, "upload failed");
            }
        }
        result
    }

    /// Serialize and upload a session log. Returns the uploaded file name.
    pub async fn export(
        &mut self,
        events: &[LogEvent],
        player_id: &str,
        start_ms: u64,
    ) -> Result<String, UploadError> {
        let file =
            prepare_upload(events, player_id, start_ms, self.format).ok_or(UploadError::NoData)?;
        self.upload(&file).await?;
        Ok(file.name)
    }
}
