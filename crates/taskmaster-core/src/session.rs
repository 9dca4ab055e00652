use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::{error, info, warn};

use crate::kv::KeyValueStore;

pub const SESSION_KEY: &str = "taskAppUser";
pub const DARK_MODE_KEY: &str = "darkMode";

/// Who is logged in. The username only partitions task storage.
pub struct Session {
    kv: Arc<dyn KeyValueStore>,
    username: Option<String>,
}

impl Session {
    /// Reads the persisted marker; absent, blank or unreadable means logged out.
    #[tracing::instrument(skip(kv))]
    pub fn restore(kv: Arc<dyn KeyValueStore>) -> Self {
        let username = match kv.get(SESSION_KEY) {
            Ok(Some(raw)) if !raw.trim().is_empty() => Some(raw.trim().to_string()),
            Ok(_) => None,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "session marker unreadable; logged out");
                None
            }
        };
        if let Some(user) = username.as_deref() {
            info!(user, "restored session");
        }
        Self { kv, username }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.username.is_some()
    }

    #[tracing::instrument(skip(self))]
    pub fn login(&mut self, username: &str) -> anyhow::Result<&str> {
        let username = username.trim();
        if username.is_empty() {
            bail!("username cannot be empty");
        }

        if let Err(err) = self.kv.set(SESSION_KEY, username) {
            error!(error = %format!("{err:#}"), "failed to persist session marker");
        }
        info!(user = username, "logged in");
        Ok(self.username.insert(username.to_string()).as_str())
    }

    #[tracing::instrument(skip(self))]
    pub fn logout(&mut self) {
        if let Some(user) = self.username.take() {
            info!(user = %user, "logged out");
        }
        if let Err(err) = self.kv.remove(SESSION_KEY) {
            error!(error = %format!("{err:#}"), "failed to clear session marker");
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl From<bool> for Theme {
    fn from(dark: bool) -> Self {
        if dark { Self::Dark } else { Self::Light }
    }
}

/// Display preferences, stored independently of any user.
pub struct Preferences {
    kv: Arc<dyn KeyValueStore>,
    theme: Theme,
}

impl Preferences {
    #[tracing::instrument(skip(kv))]
    pub fn restore(kv: Arc<dyn KeyValueStore>) -> Self {
        let theme = match read_dark_mode(kv.as_ref()) {
            Ok(dark) => Theme::from(dark.unwrap_or(false)),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "dark mode flag unreadable; using light theme");
                Theme::Light
            }
        };
        Self { kv, theme }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn dark_mode(&self) -> bool {
        self.theme.is_dark()
    }

    #[tracing::instrument(skip(self))]
    pub fn set_dark_mode(&mut self, dark: bool) {
        self.theme = Theme::from(dark);
        let payload = if dark { "true" } else { "false" };
        if let Err(err) = self.kv.set(DARK_MODE_KEY, payload) {
            error!(error = %format!("{err:#}"), "failed to persist dark mode flag");
        }
    }

    pub fn toggle_dark_mode(&mut self) -> Theme {
        self.set_dark_mode(self.theme.toggled().is_dark());
        self.theme
    }
}

fn read_dark_mode(kv: &dyn KeyValueStore) -> anyhow::Result<Option<bool>> {
    let Some(raw) = kv.get(DARK_MODE_KEY)? else {
        return Ok(None);
    };
    let dark = serde_json::from_str::<bool>(raw.trim())
        .with_context(|| format!("invalid {DARK_MODE_KEY} value '{raw}'"))?;
    Ok(Some(dark))
}
