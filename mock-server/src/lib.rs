//! In-memory fake of the bookkeeping API.
//!
//! Every `/v1/{entity}` collection is an independent table keyed by a
//! server-assigned integer id. Lists and writes answer with the
//! `{"items": [...]}` envelope the real service uses. Requests must carry
//! `Authorization: Bearer <token>`. For retry tests, `fail_next` queues
//! status codes that are returned, in order, before any routing happens.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;

pub const DEFAULT_TOKEN: &str = "test-token";

/// Query keys that never act as equality filters.
const RESERVED_KEYS: &[&str] = &["order", "limit", "offset", "expand", "count", "dateFrom", "dateTo"];

pub type Record = Map<String, Value>;

#[derive(Default)]
struct Db {
    tables: HashMap<String, BTreeMap<i64, Record>>,
    faults: VecDeque<u16>,
}

/// Shared state of one fake API instance. Clones share the same data.
#[derive(Clone)]
pub struct MockApi {
    token: Arc<String>,
    db: Arc<Mutex<Db>>,
    next_id: Arc<AtomicI64>,
    hits: Arc<AtomicUsize>,
}

impl MockApi {
    pub fn new(token: &str) -> Self {
        Self {
            token: Arc::new(token.to_string()),
            db: Arc::new(Mutex::new(Db::default())),
            next_id: Arc::new(AtomicI64::new(1)),
            hits: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer the next requests with these statuses, one per request.
    pub fn fail_next(&self, statuses: &[u16]) {
        self.db().faults.extend(statuses.iter().copied());
    }

    /// Number of requests received, faulted ones included.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Insert a record directly, returning its id.
    ///
    /// # Panics
    /// If `record` is not a JSON object.
    pub fn seed(&self, entity: &str, record: Value) -> i64 {
        let mut record = match record {
            Value::Object(map) => map,
            other => panic!("seed record must be an object, got {other}"),
        };
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        record.insert("id".to_string(), json!(id));
        self.db()
            .tables
            .entry(entity.to_string())
            .or_default()
            .insert(id, record);
        id
    }

    fn db(&self) -> MutexGuard<'_, Db> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/{entity}", get(list_records).post(create_record))
            .route(
                "/v1/{entity}/{id}",
                get(get_record).put(update_record).delete(delete_record),
            )
            .route("/v1/{entity}/{id}/{action}", post(run_action))
            .route("/v1/{entity}/{id}/{action}/{other}", post(run_nested_action))
            .layer(middleware::from_fn_with_state(self.clone(), guard))
            .with_state(self.clone())
    }
}

pub fn app() -> Router {
    MockApi::new(DEFAULT_TOKEN).router()
}

pub async fn serve(listener: TcpListener, api: MockApi) -> Result<(), std::io::Error> {
    axum::serve(listener, api.router()).await
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}

fn validation_error(errors: &[&str]) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "message": "Validation failed", "errors": errors })),
    )
        .into_response()
}

async fn guard(State(api): State<MockApi>, request: Request, next: Next) -> Response {
    api.hits.fetch_add(1, Ordering::SeqCst);

    let fault = api.db().faults.pop_front();
    if let Some(status) = fault {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = error(status, format!("injected {}", status.as_u16()));
        if status == StatusCode::TOO_MANY_REQUESTS {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("0"));
        }
        return response;
    }

    let expected = format!("Bearer {}", api.token);
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return error(StatusCode::UNAUTHORIZED, "Invalid API key");
    }

    next.run(request).await
}

/// Render a stored value the way it appears in a query string.
fn query_form(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn matching(table: Option<&BTreeMap<i64, Record>>, params: &HashMap<String, String>) -> Vec<Record> {
    let filters: Vec<(&String, &String)> = params
        .iter()
        .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
        .collect();

    table
        .into_iter()
        .flat_map(|t| t.values())
        .filter(|record| {
            filters
                .iter()
                .all(|(k, v)| record.get(k.as_str()).and_then(query_form).as_deref() == Some(v.as_str()))
        })
        .cloned()
        .collect()
}

fn parse_body(body: &Bytes) -> Result<Option<Value>, Response> {
    if body.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| error(StatusCode::BAD_REQUEST, format!("malformed JSON: {e}")))
}

fn parse_record(body: &Bytes) -> Result<Record, Response> {
    match parse_body(body)? {
        Some(Value::Object(map)) if !map.is_empty() => Ok(map),
        Some(Value::Object(_)) | None => Err(validation_error(&["at least one field is required"])),
        Some(_) => Err(validation_error(&["body must be a JSON object"])),
    }
}

fn parse_id(raw: &str) -> Result<i64, Response> {
    raw.parse()
        .map_err(|_| error(StatusCode::NOT_FOUND, format!("no record with id {raw}")))
}

async fn list_records(
    State(api): State<MockApi>,
    Path(entity): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let db = api.db();
    let mut items = matching(db.tables.get(&entity), &params);

    let offset = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    items = items.into_iter().skip(offset).collect();
    if let Some(limit) = params.get("limit").and_then(|v| v.parse().ok()) {
        items.truncate(limit);
    }

    Json(json!({ "items": items })).into_response()
}

async fn create_record(State(api): State<MockApi>, Path(entity): Path<String>, body: Bytes) -> Response {
    let mut record = match parse_record(&body) {
        Ok(record) => record,
        Err(response) => return response,
    };
    let id = api.next_id.fetch_add(1, Ordering::SeqCst);
    record.insert("id".to_string(), json!(id));
    api.db()
        .tables
        .entry(entity)
        .or_default()
        .insert(id, record.clone());
    Json(json!({ "items": [record] })).into_response()
}

async fn get_record(
    State(api): State<MockApi>,
    Path((entity, id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let db = api.db();
    if id == "count" {
        let count = matching(db.tables.get(&entity), &params).len();
        return Json(json!({ "count": count })).into_response();
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match db.tables.get(&entity).and_then(|t| t.get(&id)) {
        Some(record) => Json(Value::Object(record.clone())).into_response(),
        None => error(StatusCode::NOT_FOUND, format!("{entity} {id} not found")),
    }
}

async fn update_record(
    State(api): State<MockApi>,
    Path((entity, id)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let changes = match parse_record(&body) {
        Ok(record) => record,
        Err(response) => return response,
    };
    let mut db = api.db();
    let Some(record) = db.tables.get_mut(&entity).and_then(|t| t.get_mut(&id)) else {
        return error(StatusCode::NOT_FOUND, format!("{entity} {id} not found"));
    };
    for (key, value) in changes {
        if key != "id" {
            record.insert(key, value);
        }
    }
    Json(json!({ "items": [record.clone()] })).into_response()
}

async fn delete_record(State(api): State<MockApi>, Path((entity, id)): Path<(String, String)>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let removed = api
        .db()
        .tables
        .get_mut(&entity)
        .and_then(|t| t.remove(&id));
    match removed {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => error(StatusCode::NOT_FOUND, format!("{entity} {id} not found")),
    }
}

fn action_response(api: &MockApi, entity: &str, id: &str, action: String, body: &Bytes) -> Response {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let payload = match parse_body(body) {
        Ok(payload) => payload.unwrap_or(Value::Null),
        Err(response) => return response,
    };
    let exists = api
        .db()
        .tables
        .get(entity)
        .is_some_and(|t| t.contains_key(&id));
    if !exists {
        return error(StatusCode::NOT_FOUND, format!("{entity} {id} not found"));
    }
    Json(json!({ "status": "ok", "action": action, "id": id, "payload": payload })).into_response()
}

async fn run_action(
    State(api): State<MockApi>,
    Path((entity, id, action)): Path<(String, String, String)>,
    body: Bytes,
) -> Response {
    action_response(&api, &entity, &id, action, &body)
}

async fn run_nested_action(
    State(api): State<MockApi>,
    Path((entity, id, action, other)): Path<(String, String, String, String)>,
    body: Bytes,
) -> Response {
    action_response(&api, &entity, &id, format!("{action}/{other}"), &body)
}
