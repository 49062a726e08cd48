//! sitemill - Route and page table core for static-site generation
//!
//! This library maintains the canonical mapping from URL patterns to
//! template components and from concrete paths to renderable pages, with
//! deterministic match ordering, parse caching, and change-driven rebuilds.
//!
//! # High-Level API
//!
//! Most embedders only need the [`pages`] façade:
//!
//! ```ignore
//! use sitemill::config::PagesConfig;
//! use sitemill::pages::{CreatePageInput, Pages};
//! use sitemill::route::RecordMeta;
//!
//! let mut pages = Pages::new(PagesConfig::default());
//! pages.create_page(
//!     CreatePageInput::new("/about", "src/pages/About.vue"),
//!     RecordMeta::managed(1),
//! )?;
//!
//! let matched = pages.get_match("/about");
//! ```
//!
//! Development-mode embedders wire a [`pages::PhaseRunner`] and a
//! [`pages::WatchCoordinator`] on top to react to store and component
//! changes.

pub mod cache;
pub mod config;
pub mod error;
pub mod hash;
pub mod hooks;
pub mod logging;
pub mod page;
pub mod pages;
pub mod pattern;
pub mod query;
pub mod route;

/// Version of the sitemill library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_matches_manifest() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert!(!VERSION.is_empty());
    }
}
