//! Wiring of config, cookie jar, vault and transport into one client

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::api::{ApiClient, CookieJar, HttpTransport};
use crate::config::Config;
use crate::nav::Navigator;
use crate::vault::SessionVault;

pub struct Session {
    pub api: ApiClient,
    base_url: String,
    cookies: Arc<CookieJar>,
    vault: Option<SessionVault>,
}

impl Session {
    /// Build a client for the configured backend, restoring saved cookies
    pub fn open(config: &Config, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let vault = if config.remember_session {
            Some(SessionVault::open_default()?)
        } else {
            None
        };
        Self::with_vault(config, navigator, vault)
    }

    pub fn with_vault(
        config: &Config,
        navigator: Arc<dyn Navigator>,
        vault: Option<SessionVault>,
    ) -> Result<Self> {
        let base_url = config.base_url();

        let saved = match &vault {
            Some(vault) => vault.load(&base_url).unwrap_or_else(|err| {
                warn!(error = %err, "ignoring unreadable session file");
                Default::default()
            }),
            None => Default::default(),
        };
        debug!(base_url = %base_url, restored = saved.len(), "opening session");
        let cookies = Arc::new(CookieJar::from_map(saved));

        let transport = HttpTransport::new(&base_url, config.timeout(), cookies.clone())
            .context("Failed to build HTTP client")?;
        let api = ApiClient::new(Arc::new(transport), navigator)
            .with_chat_timeout(config.chat_timeout());

        Ok(Self {
            api,
            base_url,
            cookies,
            vault,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether any session cookie is present
    pub fn has_cookies(&self) -> bool {
        !self.cookies.is_empty()
    }

    /// Write the current cookies to the vault
    pub fn persist(&self) -> Result<()> {
        match &self.vault {
            Some(vault) => vault.save(&self.base_url, &self.cookies.snapshot()),
            None => Ok(()),
        }
    }

    /// Drop cookies in memory and on disk
    pub fn forget(&self) -> Result<()> {
        self.cookies.clear();
        match &self.vault {
            Some(vault) => vault.clear(&self.base_url),
            None => Ok(()),
        }
    }
}
