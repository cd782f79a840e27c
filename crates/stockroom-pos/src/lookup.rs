//! # Lookup Service
//!
//! Barcode and name lookups against the current catalog. Every call reads
//! the catalog afresh; nothing is cached between operations.

use std::sync::Arc;

use stockroom_core::lookup;
use stockroom_core::{NameMatcher, Product};
use stockroom_db::Database;
use tracing::debug;

use crate::config::PosConfig;

/// Resolves scans and typed names to products.
#[derive(Debug, Clone)]
pub struct LookupService {
    db: Database,
    matcher: Arc<dyn NameMatcher>,
    name_limit: usize,
    cutoff: f64,
}

impl LookupService {
    /// Creates a lookup service with an explicit matcher.
    pub fn new(
        db: Database,
        matcher: Arc<dyn NameMatcher>,
        name_limit: usize,
        cutoff: f64,
    ) -> Self {
        LookupService {
            db,
            matcher,
            name_limit,
            cutoff,
        }
    }

    /// Creates a lookup service from `[lookup]` settings.
    pub fn from_config(db: Database, config: &PosConfig) -> Self {
        Self::new(
            db,
            config.matcher(),
            config.lookup.name_limit,
            config.lookup.fuzzy_cutoff,
        )
    }

    /// Name of the active matcher ("fuzzy" or "substring").
    pub fn matcher_name(&self) -> &'static str {
        self.matcher.name()
    }

    /// Configured result count for name searches.
    pub fn name_limit(&self) -> usize {
        self.name_limit
    }

    /// Exact barcode match, first in catalog order.
    pub async fn search_by_barcode(&self, code: &str) -> Option<Product> {
        debug!(code, "Barcode lookup");
        let products = self.db.catalog().load().await;
        lookup::search_by_barcode(&products, code).cloned()
    }

    /// Up to `limit` products whose name matches `query`.
    ///
    /// Substring matches come first; the matcher ranks the catalog only when
    /// there are none. Blank or overlong queries find nothing.
    pub async fn search_by_name(&self, query: &str, limit: usize) -> Vec<Product> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let products = self.db.catalog().load().await;
        let found: Vec<Product> = lookup::search_by_name(
            &products,
            query,
            limit,
            self.matcher.as_ref(),
            self.cutoff,
        )
        .into_iter()
        .cloned()
        .collect();

        debug!(
            query,
            limit,
            matcher = self.matcher.name(),
            found = found.len(),
            "Name lookup"
        );
        found
    }

    /// Name search with the configured limit.
    pub async fn search(&self, query: &str) -> Vec<Product> {
        self.search_by_name(query, self.name_limit).await
    }

    /// Barcode first, then the best name match.
    pub async fn resolve(&self, input: &str) -> Option<Product> {
        let products = self.db.catalog().load().await;
        lookup::resolve(&products, input, self.matcher.as_ref(), self.cutoff).cloned()
    }
}
