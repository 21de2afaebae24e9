//! Client code for cachesnap.
//!
//! This crate provides the cache collection pipeline and the browser
//! surfaces it reads Cache Storage through.

pub mod collector;
pub mod source;
pub mod target;

#[cfg(feature = "browser")]
pub mod devtools;
#[cfg(feature = "browser")]
pub mod script;
#[cfg(feature = "browser")]
pub mod session;

pub use collector::{CacheSnapshotCollector, CollectOptions, DEFAULT_PAGE_SIZE};
pub use source::{CacheRef, CacheSource, EntryPage, EntryQuery};
pub use target::{UrlError, canonicalize, origin_of, same_origin};

#[cfg(feature = "browser")]
pub use devtools::DevToolsSource;
#[cfg(feature = "browser")]
pub use script::ScriptSource;
#[cfg(feature = "browser")]
pub use session::{BrowserOptions, BrowserSession};
