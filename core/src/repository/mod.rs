//! Entity repositories.
//!
//! # Design
//! `Repository<M>` binds one entity type to one endpoint and implements the
//! CRUD operations once. Entity-specific filters and action endpoints are
//! inherent impls on the concrete instantiation (`impl Repository<Deal>`)
//! in the sibling modules, so every repository shares the same plumbing.
//!
//! `find_by_id` and `delete` fold every failure into `None` / `false`. The
//! cause is logged at `warn` with its label before it is dropped.

mod categories;
mod deals;
mod moneybags;
mod partners;
mod transactions;

/// Endpoint paths, relative to the base URL.
pub mod endpoints {
    pub const CATEGORY: &str = "v1/category";
    pub const MONEYBAG: &str = "v1/moneybag";
    pub const PARTNER: &str = "v1/partner";
    pub const TRANSACTION: &str = "v1/transaction";
    pub const DEAL: &str = "v1/deal";
    pub const DIRECTION: &str = "v1/direction";
    pub const EMPLOYEE: &str = "v1/employees";
    pub const GOODS: &str = "v1/goods";
    pub const JOB: &str = "v1/job";
    pub const OBLIGATION: &str = "v1/obligation";
    pub const MONEYBAG_GROUP: &str = "v1/moneybag-group";
    pub const PARTNER_GROUP: &str = "v1/partner-group";
    pub const DEAL_STATUS: &str = "v1/deal-status";
    pub const OBLIGATION_STATUS: &str = "v1/obligation-status";
}

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::codec;
use crate::error::{ApiError, Result};
use crate::models::Model;
use crate::query::{to_pairs, QueryBuilder, QueryParams, QueryValue, COUNT_KEY};
use crate::transport::Transport;

pub struct Repository<M: Model> {
    transport: Arc<Transport>,
    endpoint: String,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Repository<M> {
    pub fn new(transport: Arc<Transport>, endpoint: &str) -> Self {
        Self {
            transport,
            endpoint: endpoint.trim_matches('/').to_string(),
            _model: PhantomData,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn query(&self) -> QueryBuilder<'_, M> {
        QueryBuilder::new(self)
    }

    pub fn find_all(&self) -> Result<Vec<M>> {
        let data = self.transport.get(&self.collection_path(), &[])?;
        parse_list(&data)
    }

    /// Fetch one entity. Any failure, including transient ones, reads as
    /// "not found".
    pub fn find_by_id(&self, id: i64) -> Option<M> {
        let result = self
            .transport
            .get(&self.item_path(id), &[])
            .and_then(|data| codec::parse::<M>(single_record::<M>(&data)?));
        match result {
            Ok(entity) => Some(entity),
            Err(err) => {
                warn!(entity = M::KIND, id, error = err.label(), %err, "find_by_id failed; reporting not found");
                None
            }
        }
    }

    /// Create an entity; the server answers `{"items": [created]}`.
    pub fn create(&self, entity: &M) -> Result<M> {
        let body = Value::Object(codec::serialize(entity)?);
        let data = self.transport.post(&self.collection_path(), Some(&body))?;
        first_item(&data)
    }

    pub fn update(&self, id: i64, entity: &M) -> Result<M> {
        let body = Value::Object(codec::serialize(entity)?);
        let data = self.transport.put(&self.item_path(id), Some(&body))?;
        first_item(&data)
    }

    /// Delete an entity. Any failure reads as `false`.
    pub fn delete(&self, id: i64) -> bool {
        match self.transport.delete(&self.item_path(id)) {
            Ok(_) => true,
            Err(err) => {
                warn!(entity = M::KIND, id, error = err.label(), %err, "delete failed");
                false
            }
        }
    }

    /// List entities matching the given parameters.
    pub fn list(&self, params: &QueryParams) -> Result<Vec<M>> {
        let data = self.transport.get(&self.collection_path(), &to_pairs(params))?;
        parse_list(&data)
    }

    /// List entities whose `key` equals `value`.
    pub fn list_by(&self, key: &str, value: impl Into<QueryValue>) -> Result<Vec<M>> {
        let mut params = QueryParams::new();
        params.insert(key.to_string(), value.into());
        self.list(&params)
    }

    pub(crate) fn count(&self, params: &QueryParams) -> Result<u64> {
        let mut params = params.clone();
        params.insert(COUNT_KEY.to_string(), QueryValue::Boolean(true));
        let path = format!("{}/count", self.collection_path());
        let data = self.transport.get(&path, &to_pairs(&params))?;
        Ok(data.get("count").and_then(Value::as_u64).unwrap_or(0))
    }

    /// POST to `<endpoint>/<id>/<action>` and hand back the decoded body.
    pub(crate) fn action(&self, id: i64, action: &str, body: Option<Map<String, Value>>) -> Result<Value> {
        let path = format!("{}/{action}", self.item_path(id));
        let body = body.map(Value::Object);
        self.transport.post(&path, body.as_ref())
    }

    fn collection_path(&self) -> String {
        format!("/{}", self.endpoint)
    }

    fn item_path(&self, id: i64) -> String {
        format!("/{}/{id}", self.endpoint)
    }
}

impl<M: Model> fmt::Debug for Repository<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &M::KIND)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Normalize a list response: `{items}`, `{results}`, a bare list, or a
/// single object. Falsy entries are skipped.
fn parse_list<M: Model>(data: &Value) -> Result<Vec<M>> {
    let single;
    let items: &[Value] = match data {
        Value::Object(map) => match map.get("items").or_else(|| map.get("results")) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) => &[],
            Some(other) => {
                single = [other.clone()];
                &single
            }
            None => std::slice::from_ref(data),
        },
        Value::Array(items) => items,
        other => std::slice::from_ref(other),
    };

    items
        .iter()
        .filter(|item| !is_falsy(item))
        .map(codec::parse::<M>)
        .collect()
}

fn first_item<M: Model>(data: &Value) -> Result<M> {
    match data.get("items").and_then(Value::as_array) {
        Some(items) => codec::parse::<M>(items.first().ok_or_else(empty_response::<M>)?),
        None => Err(empty_response::<M>()),
    }
}

/// The record of a single-entity response: the first element of an
/// `{items}` / `{results}` envelope, or the body itself when bare.
fn single_record<M: Model>(data: &Value) -> Result<&Value> {
    match data.get("items").or_else(|| data.get("results")) {
        Some(Value::Array(items)) => items.first().ok_or_else(empty_response::<M>),
        _ => Ok(data),
    }
}

fn empty_response<M: Model>() -> ApiError {
    ApiError::EmptyResponse(format!("server returned no {} in the response", M::KIND))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::{ExchangeError, HttpMethod};
    use crate::models::{Category, Group, Partner};
    use crate::transport::testing::{reply, transport, Step};

    fn categories(steps: Vec<Step>) -> (Repository<Category>, Arc<crate::transport::testing::ScriptedExchange>) {
        let (transport, exchange) = transport(steps);
        (Repository::new(transport, "v1/category"), exchange)
    }

    #[test]
    fn find_all_normalizes_every_envelope() {
        let bodies = [
            r#"{"items": [{"id": 1, "name": "Sales"}]}"#,
            r#"{"results": [{"id": 1, "name": "Sales"}]}"#,
            r#"[{"id": 1, "name": "Sales"}]"#,
            r#"{"id": 1, "name": "Sales"}"#,
        ];
        for body in bodies {
            let (repo, _) = categories(vec![reply(200, body)]);
            let found = repo.find_all().unwrap();
            assert_eq!(found.len(), 1, "{body}");
            assert_eq!(found[0].id, Some(1), "{body}");
            assert_eq!(found[0].name.as_deref(), Some("Sales"), "{body}");
        }
    }

    #[test]
    fn find_all_skips_falsy_items() {
        let (repo, _) = categories(vec![reply(200, r#"[{"id": 1}, null, {"id": 2}, {}]"#)]);
        let found = repo.find_all().unwrap();
        assert_eq!(found.iter().map(|c| c.id).collect::<Vec<_>>(), vec![Some(1), Some(2)]);
    }

    #[test]
    fn find_all_on_empty_body_is_empty() {
        let (repo, _) = categories(vec![reply(200, "")]);
        assert!(repo.find_all().unwrap().is_empty());
    }

    #[test]
    fn find_all_propagates_errors() {
        let (repo, _) = categories(vec![reply(401, r#"{"message": "bad key"}"#)]);
        let err = repo.find_all().unwrap_err();
        assert_eq!(err.to_string(), "[401] bad key");
    }

    #[test]
    fn find_by_id_parses_entity() {
        let (repo, exchange) = categories(vec![reply(200, r#"{"id": 5, "group": "income"}"#)]);
        let found = repo.find_by_id(5).unwrap();
        assert_eq!(found.group, Some(Group::Income));
        assert_eq!(exchange.requests()[0].url, "https://api.example.test/v1/category/5");
    }

    #[test]
    fn find_by_id_unwraps_single_item_envelope() {
        for body in [
            r#"{"items": [{"id": 5, "name": "Sales"}]}"#,
            r#"{"results": [{"id": 5, "name": "Sales"}]}"#,
        ] {
            let (repo, _) = categories(vec![reply(200, body)]);
            let found = repo.find_by_id(5).unwrap();
            assert_eq!(found.id, Some(5), "{body}");
            assert_eq!(found.name.as_deref(), Some("Sales"), "{body}");
        }

        let (repo, _) = categories(vec![reply(200, r#"{"items": []}"#)]);
        assert!(repo.find_by_id(5).is_none());
    }

    #[test]
    fn find_by_id_collapses_failures_to_none() {
        let (repo, _) = categories(vec![reply(404, r#"{"message": "not found"}"#)]);
        assert!(repo.find_by_id(9).is_none());

        let (repo, _) = categories(vec![reply(200, r#"{"id": "bad"}"#)]);
        assert!(repo.find_by_id(9).is_none());

        let (repo, _) = categories(vec![Err(ExchangeError::Other("tls".into()))]);
        assert!(repo.find_by_id(9).is_none());
    }

    #[test]
    fn create_posts_serialized_entity_and_returns_first_item() {
        let (transport, exchange) =
            transport(vec![reply(200, r#"{"items": [{"id": 12, "name": "Acme", "inn": "7700"}]}"#)]);
        let repo: Repository<Partner> = Repository::new(transport, "v1/partner");
        let draft = Partner {
            name: Some("Acme".to_string()),
            inn: Some("7700".to_string()),
            ..Default::default()
        };
        let created = repo.create(&draft).unwrap();
        assert_eq!(created.id, Some(12));

        let req = &exchange.requests()[0];
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://api.example.test/v1/partner");
        let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(sent, json!({"name": "Acme", "inn": "7700"}));
    }

    #[test]
    fn create_without_items_is_empty_response() {
        let (repo, _) = categories(vec![reply(200, r#"{"items": []}"#)]);
        let err = repo.create(&Category::default()).unwrap_err();
        assert!(matches!(err, ApiError::EmptyResponse(_)));
    }

    #[test]
    fn update_puts_to_item_path() {
        let (repo, exchange) = categories(vec![reply(200, r#"{"items": [{"id": 3, "name": "Renamed"}]}"#)]);
        let patch = Category {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let updated = repo.update(3, &patch).unwrap();
        assert_eq!(updated.name.as_deref(), Some("Renamed"));

        let req = &exchange.requests()[0];
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "https://api.example.test/v1/category/3");
    }

    #[test]
    fn delete_reports_success_as_bool() {
        let (repo, exchange) = categories(vec![reply(200, "")]);
        assert!(repo.delete(3));
        assert_eq!(exchange.requests()[0].method, HttpMethod::Delete);

        let (repo, _) = categories(vec![reply(404, "")]);
        assert!(!repo.delete(3));

        let (repo, _) = categories(vec![reply(500, "")]);
        assert!(!repo.delete(3));

        let (repo, _) = categories(vec![Err(ExchangeError::Connection("refused".into()))]);
        assert!(!repo.delete(3));
    }

    #[test]
    fn list_by_sends_single_filter() {
        let (repo, exchange) = categories(vec![reply(200, r#"{"items": []}"#)]);
        repo.list_by("parentId", 4).unwrap();
        assert_eq!(exchange.requests()[0].query, vec![("parentId".to_string(), "4".to_string())]);
    }

    #[test]
    fn falsy_values() {
        assert!(is_falsy(&json!(null)));
        assert!(is_falsy(&json!(false)));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!("")));
        assert!(is_falsy(&json!([])));
        assert!(is_falsy(&json!({})));
        assert!(!is_falsy(&json!({"id": 1})));
    }
}
