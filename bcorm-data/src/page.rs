use serde::{Deserialize, Serialize};

use crate::query::QueryBuilder;

/// Pagination parameters, mapped to the API's `page` and `limit` query keys.
///
/// Pages are numbered from 1, as the API numbers them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    50
}

fn default_ascending() -> bool {
    true
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            sort: None,
            ascending: true,
        }
    }
}

impl Pageable {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit,
            ..Self::default()
        }
    }

    pub fn sorted(mut self, field: &str, ascending: bool) -> Self {
        self.sort = Some(field.to_string());
        self.ascending = ascending;
        self
    }

    /// Add this page's parameters to a query.
    pub fn apply(&self, query: QueryBuilder) -> QueryBuilder {
        let query = query.page(self.page.max(1)).limit(self.limit);
        match &self.sort {
            Some(field) => query.order(field, self.ascending),
            None => query,
        }
    }
}

/// A page of results with pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total_elements: u64) -> Self {
        let total_pages = if pageable.limit == 0 {
            0
        } else {
            total_elements.div_ceil(pageable.limit)
        };
        Self {
            content,
            page: pageable.page,
            limit: pageable.limit,
            total_elements,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}
