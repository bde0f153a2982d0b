//! Granary - self-hosted file CDN
//!
//! Serves user-uploaded files over HTTP under a two-level namespace:
//! each registered domain owns a tree of categories, each category a
//! flat set of files with generated names. An external command front
//! end mutates the namespace through this library while the read path
//! answers `GET`/`HEAD` on every registered public host.
//!
//! ## Components
//!
//! - **Registry**: catalog of domains and categories, persisted to two
//!   JSON files, with a hostname reverse index for the read path
//! - **FileStore**: filesystem blob store laid out as
//!   `{base}/{domain}/{category}/{file}`
//! - **SettingsStore**: global and per-channel upload defaults
//! - **HttpServer**: the read path, serving stored files with cache
//!   validation and CORS headers
//! - **fetch**: one-shot remote download helper for upload flows

pub mod config;
pub mod error;
pub mod fetch;
pub mod file_store;
pub mod http;
pub mod registry;
pub mod settings;
pub mod sniff;

pub use config::Args;
pub use error::{GranaryError, Result};
pub use fetch::fetch_url;
pub use file_store::{generate_etag, FileStore, StoredFile};
pub use http::HttpServer;
pub use registry::{CategoryRecord, DomainRecord, Registry};
pub use settings::{BindingRef, ChannelBinding, GlobalDefaults, SettingsStore};
