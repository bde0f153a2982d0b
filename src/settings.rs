//! Upload default bindings
//!
//! Holds the global default (domain, category) pair and per-channel
//! overrides keyed by an opaque channel identifier, persisted to one
//! JSON file on every mutation. Bindings reference catalog entries by
//! folder id; the reference lookups here let the command front end
//! refuse to remove a domain or category something still points at.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::Result;

/// Fallback upload target when a channel has no binding of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalDefaults {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
}

/// Per-channel upload target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBinding {
    pub domain: String,
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Settings {
    #[serde(default)]
    global_defaults: GlobalDefaults,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    channel_configs: HashMap<String, ChannelBinding>,
}

/// What still references a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingRef {
    GlobalDefault,
    Channel(String),
}

/// Persisted binding store.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    state: RwLock<Settings>,
}

impl SettingsStore {
    /// Open the settings file, creating an empty one if it is missing.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let settings = match fs::read(&path).await {
            Ok(data) => serde_json::from_slice(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let settings = Settings::default();
                write_settings(&path, &settings).await?;
                info!(path = %path.display(), "Created settings file");
                settings
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            state: RwLock::new(settings),
        })
    }

    pub async fn set_global_defaults(&self, domain: &str, category: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.global_defaults = GlobalDefaults {
            domain: domain.to_string(),
            category: category.to_string(),
        };
        write_settings(&self.path, &state).await?;
        info!(domain = %domain, category = %category, "Global defaults updated");
        Ok(())
    }

    /// Raw defaults snapshot; either field may still be empty.
    pub async fn global_defaults(&self) -> GlobalDefaults {
        self.state.read().await.global_defaults.clone()
    }

    pub async fn set_channel(&self, channel_id: &str, domain: &str, category: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.channel_configs.insert(
            channel_id.to_string(),
            ChannelBinding {
                domain: domain.to_string(),
                category: category.to_string(),
            },
        );
        write_settings(&self.path, &state).await?;
        info!(channel = %channel_id, domain = %domain, category = %category, "Channel binding updated");
        Ok(())
    }

    pub async fn channel(&self, channel_id: &str) -> Option<ChannelBinding> {
        self.state.read().await.channel_configs.get(channel_id).cloned()
    }

    /// Drop a channel binding. Removing an absent binding is not an
    /// error; callers wanting to report one check `channel` first.
    pub async fn remove_channel(&self, channel_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.channel_configs.remove(channel_id);
        write_settings(&self.path, &state).await?;
        debug!(channel = %channel_id, "Channel binding removed");
        Ok(())
    }

    /// All channel bindings, sorted by channel id.
    pub async fn list_channels(&self) -> Vec<(String, ChannelBinding)> {
        let state = self.state.read().await;
        let mut bindings: Vec<(String, ChannelBinding)> = state
            .channel_configs
            .iter()
            .map(|(id, binding)| (id.clone(), binding.clone()))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(&b.0));
        bindings
    }

    /// Upload target for a channel: its own binding, else the global
    /// defaults once both of their fields are set.
    pub async fn effective_binding(&self, channel_id: &str) -> Option<(String, String)> {
        let state = self.state.read().await;
        if let Some(binding) = state.channel_configs.get(channel_id) {
            return Some((binding.domain.clone(), binding.category.clone()));
        }
        let defaults = &state.global_defaults;
        if !defaults.domain.is_empty() && !defaults.category.is_empty() {
            return Some((defaults.domain.clone(), defaults.category.clone()));
        }
        None
    }

    /// First binding still naming this domain, if any.
    pub async fn domain_reference(&self, folder_id: &str) -> Option<BindingRef> {
        let state = self.state.read().await;
        if state.global_defaults.domain == folder_id {
            return Some(BindingRef::GlobalDefault);
        }
        state
            .channel_configs
            .iter()
            .find(|(_, binding)| binding.domain == folder_id)
            .map(|(id, _)| BindingRef::Channel(id.clone()))
    }

    /// First binding still naming this category, if any.
    pub async fn category_reference(&self, folder_id: &str) -> Option<BindingRef> {
        let state = self.state.read().await;
        if state.global_defaults.category == folder_id {
            return Some(BindingRef::GlobalDefault);
        }
        state
            .channel_configs
            .iter()
            .find(|(_, binding)| binding.category == folder_id)
            .map(|(id, _)| BindingRef::Channel(id.clone()))
    }
}

async fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    let data = serde_json::to_vec_pretty(settings)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, data).await?;
    Ok(())
}
