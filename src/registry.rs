//! Domain and category catalog
//!
//! In-memory catalog of serving domains and file categories with a
//! reverse index from public hostname to domain. Mutations are kept in
//! memory; persistence happens through explicit save calls so callers
//! can report "added but not yet saved" states. Both tables share one
//! reader-writer lock, so every operation is atomic with respect to
//! every other.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{GranaryError, Result};

/// Persisted domain record. Field names match the on-disk catalog
/// format, which predates this implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    #[serde(rename = "folder-name")]
    pub folder_id: String,
    #[serde(rename = "display-name")]
    pub display_name: String,
    #[serde(rename = "domain-fqdn")]
    pub public_host: String,
}

/// Persisted category record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    #[serde(rename = "folder-name")]
    pub folder_id: String,
    #[serde(rename = "display-name")]
    pub display_name: String,
}

#[derive(Debug, Clone)]
struct DomainEntry {
    display_name: String,
    public_host: String,
}

#[derive(Default)]
struct Catalog {
    domains: HashMap<String, DomainEntry>,
    categories: HashMap<String, String>,
}

/// Replace spaces with dashes; casing is preserved.
pub fn normalize_folder_id(raw: &str) -> String {
    raw.replace(' ', "-")
}

/// Strip protocol prefixes and a single trailing slash from a host.
fn strip_protocol(raw: &str) -> &str {
    let host = raw.strip_prefix("https://").unwrap_or(raw);
    let host = host.strip_prefix("http://").unwrap_or(host);
    let host = host.strip_prefix("ftp://").unwrap_or(host);
    host.strip_suffix('/').unwrap_or(host)
}

/// Catalog of domains and categories.
pub struct Registry {
    state: RwLock<Catalog>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Catalog::default()),
        }
    }

    /// Register a domain under a normalized folder id.
    ///
    /// The public host is stored protocol-stripped. Fails with
    /// `AlreadyExists` when the folder id is taken or when another
    /// domain already claims the host (host uniqueness is what makes
    /// the reverse lookup unambiguous).
    pub async fn add_domain(
        &self,
        folder_id: &str,
        display_name: &str,
        public_host: &str,
    ) -> Result<()> {
        let folder_id = normalize_folder_id(folder_id);
        let host = strip_protocol(public_host).to_string();

        let mut state = self.state.write().await;
        if state.domains.contains_key(&folder_id) {
            return Err(GranaryError::AlreadyExists(format!(
                "domain with folder-name '{}'",
                folder_id
            )));
        }
        if state.domains.values().any(|d| d.public_host == host) {
            return Err(GranaryError::AlreadyExists(format!(
                "domain with host '{}'",
                host
            )));
        }

        state.domains.insert(
            folder_id.clone(),
            DomainEntry {
                display_name: display_name.to_string(),
                public_host: host.clone(),
            },
        );
        info!(domain = %folder_id, host = %host, "Domain added");
        Ok(())
    }

    /// Remove a domain. Any blobs stored under it stay on disk; callers
    /// holding default bindings are expected to check those first.
    pub async fn remove_domain(&self, folder_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.domains.remove(folder_id).is_none() {
            return Err(GranaryError::NotFound(format!("domain '{}'", folder_id)));
        }
        info!(domain = %folder_id, "Domain removed");
        Ok(())
    }

    /// Register a category under a normalized folder id.
    pub async fn add_category(&self, folder_id: &str, display_name: &str) -> Result<()> {
        let folder_id = normalize_folder_id(folder_id);

        let mut state = self.state.write().await;
        if state.categories.contains_key(&folder_id) {
            return Err(GranaryError::AlreadyExists(format!(
                "category with folder-name '{}'",
                folder_id
            )));
        }
        state
            .categories
            .insert(folder_id.clone(), display_name.to_string());
        info!(category = %folder_id, "Category added");
        Ok(())
    }

    pub async fn remove_category(&self, folder_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.categories.remove(folder_id).is_none() {
            return Err(GranaryError::NotFound(format!("category '{}'", folder_id)));
        }
        info!(category = %folder_id, "Category removed");
        Ok(())
    }

    /// Reverse lookup: exact, case-sensitive host match. Host uniqueness
    /// is enforced at add time, so at most one domain matches.
    pub async fn domain_by_host(&self, host: &str) -> Option<(String, String)> {
        let state = self.state.read().await;
        state
            .domains
            .iter()
            .find(|(_, entry)| entry.public_host == host)
            .map(|(folder_id, entry)| (folder_id.clone(), entry.display_name.clone()))
    }

    pub async fn domain_exists(&self, folder_id: &str) -> bool {
        self.state.read().await.domains.contains_key(folder_id)
    }

    pub async fn category_exists(&self, folder_id: &str) -> bool {
        self.state.read().await.categories.contains_key(folder_id)
    }

    pub async fn domain_display_name(&self, folder_id: &str) -> Option<String> {
        let state = self.state.read().await;
        state
            .domains
            .get(folder_id)
            .map(|entry| entry.display_name.clone())
    }

    /// Public host a domain serves under, as stored (protocol-stripped).
    pub async fn domain_host(&self, folder_id: &str) -> Option<String> {
        let state = self.state.read().await;
        state
            .domains
            .get(folder_id)
            .map(|entry| entry.public_host.clone())
    }

    pub async fn category_display_name(&self, folder_id: &str) -> Option<String> {
        let state = self.state.read().await;
        state.categories.get(folder_id).cloned()
    }

    /// All domains, sorted by folder id for stable listings.
    pub async fn list_domains(&self) -> Vec<DomainRecord> {
        let state = self.state.read().await;
        let mut records: Vec<DomainRecord> = state
            .domains
            .iter()
            .map(|(folder_id, entry)| DomainRecord {
                folder_id: folder_id.clone(),
                display_name: entry.display_name.clone(),
                public_host: entry.public_host.clone(),
            })
            .collect();
        records.sort_by(|a, b| a.folder_id.cmp(&b.folder_id));
        records
    }

    /// All categories, sorted by folder id.
    pub async fn list_categories(&self) -> Vec<CategoryRecord> {
        let state = self.state.read().await;
        let mut records: Vec<CategoryRecord> = state
            .categories
            .iter()
            .map(|(folder_id, display_name)| CategoryRecord {
                folder_id: folder_id.clone(),
                display_name: display_name.clone(),
            })
            .collect();
        records.sort_by(|a, b| a.folder_id.cmp(&b.folder_id));
        records
    }

    /// Load the domain catalog from a JSON file, replacing the current
    /// table wholesale. Folder ids are re-normalized on the way in. On
    /// read or parse failure the table is left untouched.
    pub async fn load_domains<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let mut state = self.state.write().await;
        let data = fs::read(path.as_ref()).await?;
        let records: Vec<DomainRecord> = serde_json::from_slice(&data)?;

        state.domains = records
            .into_iter()
            .map(|r| {
                (
                    normalize_folder_id(&r.folder_id),
                    DomainEntry {
                        display_name: r.display_name,
                        public_host: r.public_host,
                    },
                )
            })
            .collect();
        Ok(state.domains.len())
    }

    /// Load the category catalog, replacing the current table wholesale.
    pub async fn load_categories<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let mut state = self.state.write().await;
        let data = fs::read(path.as_ref()).await?;
        let records: Vec<CategoryRecord> = serde_json::from_slice(&data)?;

        state.categories = records
            .into_iter()
            .map(|r| (normalize_folder_id(&r.folder_id), r.display_name))
            .collect();
        Ok(state.categories.len())
    }

    /// Write the domain catalog as indented JSON, creating the parent
    /// directory if needed. The lock is held across the write so the
    /// snapshot on disk always matches some consistent in-memory state.
    pub async fn save_domains<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let state = self.state.read().await;
        let mut records: Vec<DomainRecord> = state
            .domains
            .iter()
            .map(|(folder_id, entry)| DomainRecord {
                folder_id: folder_id.clone(),
                display_name: entry.display_name.clone(),
                public_host: entry.public_host.clone(),
            })
            .collect();
        records.sort_by(|a, b| a.folder_id.cmp(&b.folder_id));

        write_catalog(path.as_ref(), &records).await
    }

    pub async fn save_categories<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let state = self.state.read().await;
        let mut records: Vec<CategoryRecord> = state
            .categories
            .iter()
            .map(|(folder_id, display_name)| CategoryRecord {
                folder_id: folder_id.clone(),
                display_name: display_name.clone(),
            })
            .collect();
        records.sort_by(|a, b| a.folder_id.cmp(&b.folder_id));

        write_catalog(path.as_ref(), &records).await
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

async fn write_catalog<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let data = serde_json::to_vec_pretty(records)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, data).await?;
    Ok(())
}
