//! Chainable query builder for list and count requests.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{CategoryType, Group, Model, MoneybagType};
use crate::repository::Repository;

pub const ORDER_KEY: &str = "order";
pub const LIMIT_KEY: &str = "limit";
pub const OFFSET_KEY: &str = "offset";
pub const EXPAND_KEY: &str = "expand";
pub const COUNT_KEY: &str = "count";

/// Value of a query parameter. Filters only accept these shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Text(s) => f.write_str(s),
            QueryValue::Integer(n) => write!(f, "{n}"),
            QueryValue::Number(n) => write!(f, "{n}"),
            QueryValue::Boolean(b) => write!(f, "{b}"),
            QueryValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::Text(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::Text(v)
    }
}

impl From<&String> for QueryValue {
    fn from(v: &String) -> Self {
        QueryValue::Text(v.clone())
    }
}

impl From<i64> for QueryValue {
    fn from(v: i64) -> Self {
        QueryValue::Integer(v)
    }
}

impl From<i32> for QueryValue {
    fn from(v: i32) -> Self {
        QueryValue::Integer(v.into())
    }
}

impl From<u32> for QueryValue {
    fn from(v: u32) -> Self {
        QueryValue::Integer(v.into())
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        QueryValue::Number(v)
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        QueryValue::Boolean(v)
    }
}

impl From<NaiveDate> for QueryValue {
    fn from(v: NaiveDate) -> Self {
        QueryValue::Date(v)
    }
}

impl From<Group> for QueryValue {
    fn from(v: Group) -> Self {
        QueryValue::Text(v.as_str().to_string())
    }
}

impl From<CategoryType> for QueryValue {
    fn from(v: CategoryType) -> Self {
        QueryValue::Text(v.as_str().to_string())
    }
}

impl From<MoneybagType> for QueryValue {
    fn from(v: MoneybagType) -> Self {
        QueryValue::Text(v.as_str().to_string())
    }
}

/// Flat query-parameter mapping, ordered by key.
pub type QueryParams = BTreeMap<String, QueryValue>;

/// Render parameters as string pairs for the transport.
pub fn to_pairs(params: &QueryParams) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(key, value)| (key.clone(), value.to_string()))
        .collect()
}

/// Accumulates filters, ordering, pagination and expansions for one call.
///
/// Nothing is sent until `execute`, `first` or `count` runs.
#[must_use = "a query does nothing until executed"]
pub struct QueryBuilder<'r, M: Model> {
    repository: &'r Repository<M>,
    filters: QueryParams,
    ordering: Vec<String>,
    limit: Option<u32>,
    offset: Option<u32>,
    expand: Vec<String>,
}

impl<'r, M: Model> QueryBuilder<'r, M> {
    pub(crate) fn new(repository: &'r Repository<M>) -> Self {
        Self {
            repository,
            filters: QueryParams::new(),
            ordering: Vec::new(),
            limit: None,
            offset: None,
            expand: Vec::new(),
        }
    }

    /// Add an equality filter; a later value for the same key wins.
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn order_by(mut self, field: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.ordering.push(format!("{field}:{direction}"));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn expand<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expand.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Flatten into query parameters. Reserved keys overwrite filters.
    pub fn build(&self) -> QueryParams {
        let mut params = self.filters.clone();
        if !self.ordering.is_empty() {
            params.insert(ORDER_KEY.to_string(), QueryValue::Text(self.ordering.join(",")));
        }
        if let Some(limit) = self.limit {
            params.insert(LIMIT_KEY.to_string(), QueryValue::Integer(limit.into()));
        }
        if let Some(offset) = self.offset {
            params.insert(OFFSET_KEY.to_string(), QueryValue::Integer(offset.into()));
        }
        if !self.expand.is_empty() {
            params.insert(EXPAND_KEY.to_string(), QueryValue::Text(self.expand.join(",")));
        }
        params
    }

    pub fn execute(&self) -> Result<Vec<M>> {
        self.repository.list(&self.build())
    }

    /// Run with the limit forced to 1.
    pub fn first(self) -> Result<Option<M>> {
        let mut results = self.limit(1).execute()?;
        if results.is_empty() {
            Ok(None)
        } else {
            Ok(Some(results.swap_remove(0)))
        }
    }

    /// Count matching records; 0 when the server omits the count.
    pub fn count(&self) -> Result<u64> {
        self.repository.count(&self.build())
    }
}

impl<M: Model> fmt::Debug for QueryBuilder<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("entity", &M::KIND)
            .field("filters", &self.filters)
            .field("ordering", &self.ordering)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("expand", &self.expand)
            .finish()
    }
}
