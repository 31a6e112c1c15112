/// A fluent builder for API query strings.
///
/// # Example
///
/// ```ignore
/// let qs = QueryBuilder::new()
///     .where_in("id", &["12", "13"])
///     .where_like("name", "lamp")
///     .order("name", true)
///     .include(&["images", "variants"])
///     .limit(10)
///     .query_string();
/// assert_eq!(qs, "id:in=12,13&name:like=lamp&sort=name&direction=asc&include=images,variants&limit=10");
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    conditions: Vec<Condition>,
    order: Option<(String, bool)>,
    includes: Vec<String>,
    page_val: Option<u64>,
    limit_val: Option<u64>,
}

#[derive(Debug, Clone)]
enum Condition {
    Eq(String, String),
    In(String, Vec<String>),
    Gt(String, String),
    Lt(String, String),
    Like(String, String),
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_equal(mut self, field: &str, value: impl ToString) -> Self {
        self.conditions
            .push(Condition::Eq(field.to_string(), value.to_string()));
        self
    }

    pub fn where_in<V: ToString>(mut self, field: &str, values: &[V]) -> Self {
        self.conditions.push(Condition::In(
            field.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        ));
        self
    }

    pub fn where_greater_than(mut self, field: &str, value: impl ToString) -> Self {
        self.conditions
            .push(Condition::Gt(field.to_string(), value.to_string()));
        self
    }

    pub fn where_less_than(mut self, field: &str, value: impl ToString) -> Self {
        self.conditions
            .push(Condition::Lt(field.to_string(), value.to_string()));
        self
    }

    pub fn where_like(mut self, field: &str, pattern: &str) -> Self {
        self.conditions
            .push(Condition::Like(field.to_string(), pattern.to_string()));
        self
    }

    /// Sort by a single field; a later call replaces an earlier one.
    pub fn order(mut self, field: &str, ascending: bool) -> Self {
        self.order = Some((field.to_string(), ascending));
        self
    }

    /// Add sub-resources to embed in the response. Duplicates are ignored.
    pub fn include<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        for name in names {
            let name = name.as_ref();
            if !name.is_empty() && !self.includes.iter().any(|i| i == name) {
                self.includes.push(name.to_string());
            }
        }
        self
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page_val = Some(page);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
            && self.order.is_none()
            && self.includes.is_empty()
            && self.page_val.is_none()
            && self.limit_val.is_none()
    }

    /// Build the query string, without the leading `?`.
    ///
    /// Keys are emitted as-is (`id:in`); values are form-encoded.
    pub fn query_string(&self) -> String {
        let mut pairs: Vec<String> = Vec::new();
        for cond in &self.conditions {
            match cond {
                Condition::Eq(field, value) => pairs.push(format!("{field}={}", encode(value))),
                Condition::In(field, values) => {
                    let joined: Vec<String> = values.iter().map(|v| encode(v)).collect();
                    pairs.push(format!("{field}:in={}", joined.join(",")));
                }
                Condition::Gt(field, value) => {
                    pairs.push(format!("{field}:greater={}", encode(value)))
                }
                Condition::Lt(field, value) => pairs.push(format!("{field}:less={}", encode(value))),
                Condition::Like(field, value) => {
                    pairs.push(format!("{field}:like={}", encode(value)))
                }
            }
        }
        if let Some((field, asc)) = &self.order {
            pairs.push(format!("sort={}", encode(field)));
            pairs.push(format!("direction={}", if *asc { "asc" } else { "desc" }));
        }
        if !self.includes.is_empty() {
            let joined: Vec<String> = self.includes.iter().map(|v| encode(v)).collect();
            pairs.push(format!("include={}", joined.join(",")));
        }
        if let Some(page) = self.page_val {
            pairs.push(format!("page={page}"));
        }
        if let Some(limit) = self.limit_val {
            pairs.push(format!("limit={limit}"));
        }
        pairs.join("&")
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Append a query string to a path, skipping the `?` when there is nothing to add.
pub fn with_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}
