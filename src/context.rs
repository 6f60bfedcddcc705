//! Persisted application context: theme and the set of auto-funded wallets.
//!
//! Loaded once from a JSON file and written back on every change. A missing
//! file starts from defaults; an unreadable one is logged and replaced.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::error::Result;

/// Display theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light theme.
    #[default]
    Light,
    /// Dark theme.
    Dark,
}

impl Theme {
    /// The other theme.
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextData {
    #[serde(default)]
    theme: Theme,
    #[serde(default)]
    funded_addresses: BTreeSet<String>,
}

/// Application context persisted to a JSON file.
#[derive(Debug, Clone)]
pub struct AppContext {
    path: PathBuf,
    data: ContextData,
}

impl AppContext {
    /// Load the context at `path`, starting from defaults if it is missing or unreadable.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable app context");
                ContextData::default()
            }),
            Err(_) => {
                debug!(path = %path.display(), "No app context yet, using defaults");
                ContextData::default()
            }
        };
        Self { path, data }
    }

    /// File backing this context.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current theme.
    pub fn theme(&self) -> Theme {
        self.data.theme
    }

    /// Set and persist the theme.
    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.data.theme = theme;
        self.save()
    }

    /// Flip and persist the theme.
    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let theme = self.data.theme.toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }

    /// Whether `address` has already been auto-funded.
    pub fn is_funded(&self, address: Address) -> bool {
        self.data.funded_addresses.contains(&funded_key(address))
    }

    /// Record and persist that `address` was funded. Returns false if it already was.
    pub fn mark_funded(&mut self, address: Address) -> Result<bool> {
        if !self.data.funded_addresses.insert(funded_key(address)) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Funded addresses, lowercased.
    pub fn funded_addresses(&self) -> impl Iterator<Item = &str> {
        self.data.funded_addresses.iter().map(String::as_str)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.data)?)?;
        debug!(path = %self.path.display(), "App context saved");
        Ok(())
    }
}

fn funded_key(address: Address) -> String {
    address.to_string().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("nos-markets-{}-{}.json", name, nanos))
    }

    #[test]
    fn missing_file_starts_from_defaults() {
        let context = AppContext::load(scratch_path("missing"));
        assert_eq!(context.theme(), Theme::Light);
        assert_eq!(context.funded_addresses().count(), 0);
    }

    #[test]
    fn changes_are_persisted() {
        let path = scratch_path("persist");
        let wallet = Address::repeat_byte(0xAB);

        let mut context = AppContext::load(&path);
        assert_eq!(context.toggle_theme().unwrap(), Theme::Dark);
        assert!(context.mark_funded(wallet).unwrap());
        assert!(!context.mark_funded(wallet).unwrap());

        let reloaded = AppContext::load(&path);
        assert_eq!(reloaded.theme(), Theme::Dark);
        assert!(reloaded.is_funded(wallet));
        assert_eq!(
            reloaded.funded_addresses().collect::<Vec<_>>(),
            vec!["0xabababababababababababababababababababab"]
        );

        fs::remove_file(path).ok();
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let path = scratch_path("corrupt");
        fs::write(&path, "{not json").unwrap();

        let context = AppContext::load(&path);
        assert_eq!(context.theme(), Theme::Light);

        fs::remove_file(path).ok();
    }
}
