use anyhow::{Context, Result};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const ENV_WEBHOOK_URL: &str = "RELAY_WEBHOOK_URL";
pub const ENV_WEBHOOK_TOKEN: &str = "RELAY_WEBHOOK_TOKEN";
pub const ENV_MAILGUN_SECRET: &str = "MAILGUN_WEBHOOK_SECRET";
pub const ENV_PORT: &str = "PORT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Downstream endpoint receiving parsed statements
    pub webhook_url: String,
    /// Bearer token for the downstream endpoint
    pub webhook_token: String,
    /// Mailgun signing key; empty disables inbound verification
    pub mailgun_secret: String,
    pub port: u16,
    pub delivery_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            webhook_token: String::new(),
            mailgun_secret: String::new(),
            port: 8000,
            delivery_timeout_secs: 60,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl RelayConfig {
    /// Defaults, then the optional TOML file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
                toml::from_str(&s).with_context(|| format!("parse {}", p.display()))?
            }
            None => RelayConfig::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.trim();
        Ok(cfg)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup(ENV_WEBHOOK_URL) {
            self.webhook_url = v;
        }
        if let Some(v) = lookup(ENV_WEBHOOK_TOKEN) {
            self.webhook_token = v;
        }
        if let Some(v) = lookup(ENV_MAILGUN_SECRET) {
            self.mailgun_secret = v;
        }
        if let Some(v) = lookup(ENV_PORT) {
            self.port = v
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_PORT}: {v:?}"))?;
        }
        Ok(())
    }

    /// Hosting dashboards like to append invisible newlines to secrets.
    fn trim(&mut self) {
        for field in [
            &mut self.webhook_url,
            &mut self.webhook_token,
            &mut self.mailgun_secret,
        ] {
            *field = field.trim().to_string();
        }
    }

    pub fn webhook_configured(&self) -> bool {
        !self.webhook_url.is_empty()
    }

    pub fn webhook_token_configured(&self) -> bool {
        !self.webhook_token.is_empty()
    }

    pub fn mailgun_secret_configured(&self) -> bool {
        !self.mailgun_secret.is_empty()
    }

    /// Log what is missing. Nothing here is fatal at startup.
    pub fn report_gaps(&self) {
        if !self.webhook_configured() {
            error!("{ENV_WEBHOOK_URL} not set");
        }
        if !self.webhook_token_configured() {
            error!("{ENV_WEBHOOK_TOKEN} not set");
        }
        if !self.mailgun_secret_configured() {
            warn!("{ENV_MAILGUN_SECRET} not set - signature verification will be skipped");
        }
    }
}
