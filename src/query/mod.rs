//! Read-only, filterable search over the active catalog.
//!
//! Queries never take the write locks: they read the atomically-replaced
//! document files, so a reader sees either the state before a publish or
//! the state after it, never a half-updated list.

use std::collections::HashSet;

use serde::Serialize;

use crate::core::entry::CatalogEntry;
use crate::core::types::ServiceCategory;
use crate::store::versions::VersionManager;
use crate::store::{slug, StoreError};

/// Hard ceiling on page size.
pub const MAX_PAGE_SIZE: usize = 200;

const DEFAULT_PAGE_SIZE: usize = 50;

/// Search request for the active catalog of one service.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub service: ServiceCategory,
    pub query: Option<String>,
    pub group: Option<String>,
    /// 1-based.
    pub page: usize,
    pub limit: usize,
}

impl SearchParams {
    #[must_use]
    pub fn new(service: ServiceCategory) -> Self {
        Self {
            service,
            query: None,
            group: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of catalog search results.
#[derive(Debug, Serialize)]
pub struct CatalogPage {
    pub items: Vec<CatalogEntry>,
    pub total: usize,
    pub page: usize,
    pub pages: usize,
}

/// Read-only facade over the stores.
#[derive(Debug, Clone, Copy)]
pub struct CatalogQuery<'a> {
    manager: &'a VersionManager,
}

impl<'a> CatalogQuery<'a> {
    #[must_use]
    pub fn new(manager: &'a VersionManager) -> Self {
        Self { manager }
    }

    /// The entries referenced by the *active* version of every rate list
    /// belonging to this service. Rolling back a category therefore rolls
    /// its search surface back as well.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from the underlying stores.
    pub fn active_entries(&self, service: ServiceCategory) -> Result<Vec<CatalogEntry>, StoreError> {
        let service_id = slug(service.display_name());
        let mut active_ids: HashSet<String> = HashSet::new();
        for document in self.manager.rate_lists().load_all()? {
            let belongs = document.service_id == service_id
                || ServiceCategory::parse(&document.category) == Some(service);
            if !document.is_active || !belongs {
                continue;
            }
            if let Some(snapshot) = document.active_snapshot() {
                active_ids.extend(snapshot.catalog_ids.iter().cloned());
            }
        }

        let entries = self.manager.catalog().load_entries(service)?;
        Ok(entries
            .into_iter()
            .filter(|e| active_ids.contains(&e.fingerprint))
            .collect())
    }

    /// Case-insensitive substring search across test name, printable text,
    /// method and group, ranked by a simple relevance key (test-name hits
    /// first) and always secondarily ordered by (group asc, test name asc).
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from the underlying stores.
    pub fn search(&self, params: &SearchParams) -> Result<CatalogPage, StoreError> {
        let limit = params.limit.clamp(1, MAX_PAGE_SIZE);
        let page = params.page.max(1);

        let mut matches: Vec<CatalogEntry> = self
            .active_entries(params.service)?
            .into_iter()
            .filter(|e| group_matches(e, params.group.as_deref()))
            .filter(|e| query_matches(e, params.query.as_deref()))
            .collect();

        let needle = params
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
        matches.sort_by(|a, b| {
            let rank = |e: &CatalogEntry| match &needle {
                Some(q) if e.test_name.to_lowercase().contains(q) => 0u8,
                Some(_) => 1,
                None => 0,
            };
            rank(a)
                .cmp(&rank(b))
                .then_with(|| sort_key(a).cmp(&sort_key(b)))
        });

        let total = matches.len();
        let pages = total.div_ceil(limit);
        let start = (page - 1).saturating_mul(limit);
        let items = if start < total {
            matches[start..(start + limit).min(total)].to_vec()
        } else {
            Vec::new()
        };

        Ok(CatalogPage {
            items,
            total,
            page,
            pages,
        })
    }

    /// Distinct, non-empty, trimmed group values for a service, sorted
    /// ascending.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from the underlying stores.
    pub fn groups(&self, service: ServiceCategory) -> Result<Vec<String>, StoreError> {
        let mut groups: Vec<String> = self
            .active_entries(service)?
            .into_iter()
            .filter_map(|e| e.group)
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();
        groups.sort();
        groups.dedup();
        Ok(groups)
    }
}

fn sort_key(e: &CatalogEntry) -> (String, String) {
    (
        e.group.clone().unwrap_or_default().to_lowercase(),
        e.test_name.to_lowercase(),
    )
}

fn group_matches(entry: &CatalogEntry, group: Option<&str>) -> bool {
    match group.map(str::trim).filter(|g| !g.is_empty()) {
        None => true,
        Some(wanted) => entry
            .group
            .as_deref()
            .is_some_and(|g| g.trim().eq_ignore_ascii_case(wanted)),
    }
}

fn query_matches(entry: &CatalogEntry, query: Option<&str>) -> bool {
    let Some(needle) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return true;
    };
    let needle = needle.to_lowercase();
    let haystacks = [
        Some(entry.test_name.as_str()),
        entry.printable_text.as_deref(),
        entry.method.as_deref(),
        entry.group.as_deref(),
    ];
    haystacks
        .into_iter()
        .flatten()
        .any(|h| h.to_lowercase().contains(&needle))
}
