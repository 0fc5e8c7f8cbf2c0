use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{MockApi, DEFAULT_TOKEN};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {DEFAULT_TOKEN}"))
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    request("GET", uri, "")
}

async fn send(app: &Router, req: Request<String>) -> axum::response::Response {
    app.clone().oneshot(req).await.unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_token_is_rejected() {
    let app = MockApi::new(DEFAULT_TOKEN).router();
    let req = Request::builder().uri("/v1/category").body(String::new()).unwrap();
    let resp = send(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["message"], "Invalid API key");
}

#[tokio::test]
async fn wrong_token_is_rejected() {
    let app = MockApi::new("secret").router();
    let resp = send(&app, get("/v1/category")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- list ---

#[tokio::test]
async fn empty_collection_lists_no_items() {
    let app = mock_server::app();
    let resp = send(&app, get("/v1/partner")).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"items": []}));
}

#[tokio::test]
async fn list_filters_by_equality_and_ignores_reserved_keys() {
    let api = MockApi::new(DEFAULT_TOKEN);
    api.seed("category", json!({"name": "Sales", "group": "income"}));
    api.seed("category", json!({"name": "Rent", "group": "outcome"}));
    api.seed("category", json!({"name": "Fees", "group": "income"}));
    let app = api.router();

    let resp = send(&app, get("/v1/category?group=income&order=name:asc")).await;
    let items = body_json(resp).await["items"].as_array().unwrap().clone();
    let names: Vec<&str> = items.iter().map(|i| i["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Sales", "Fees"]);
}

#[tokio::test]
async fn list_applies_offset_then_limit() {
    let api = MockApi::new(DEFAULT_TOKEN);
    for n in 0..5 {
        api.seed("job", json!({"name": format!("job {n}")}));
    }
    let app = api.router();

    let resp = send(&app, get("/v1/job?offset=1&limit=2")).await;
    let items = body_json(resp).await["items"].clone();
    assert_eq!(items.as_array().unwrap().len(), 2);
    assert_eq!(items[0]["name"], "job 1");
}

#[tokio::test]
async fn booleans_and_numbers_filter_by_rendered_form() {
    let api = MockApi::new(DEFAULT_TOKEN);
    api.seed("moneybag", json!({"name": "Old", "archived": true, "groupId": 4}));
    api.seed("moneybag", json!({"name": "New", "archived": false, "groupId": 4}));
    let app = api.router();

    let resp = send(&app, get("/v1/moneybag?archived=false&groupId=4")).await;
    let items = body_json(resp).await["items"].clone();
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["name"], "New");
}

// --- count ---

#[tokio::test]
async fn count_reports_matching_records() {
    let api = MockApi::new(DEFAULT_TOKEN);
    api.seed("transaction", json!({"value": 10.0, "group": "income"}));
    api.seed("transaction", json!({"value": 20.0, "group": "outcome"}));
    let app = api.router();

    let resp = send(&app, get("/v1/transaction/count?count=true&group=income")).await;
    assert_eq!(body_json(resp).await, json!({"count": 1}));
}

// --- create / get / update / delete ---

#[tokio::test]
async fn create_assigns_id_and_wraps_in_items() {
    let app = mock_server::app();
    let resp = send(&app, request("POST", "/v1/partner", r#"{"name":"Acme","inn":"7700"}"#)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let created = &body["items"][0];
    assert_eq!(created["name"], "Acme");
    assert!(created["id"].is_i64());

    let id = created["id"].as_i64().unwrap();
    let resp = send(&app, get(&format!("/v1/partner/{id}"))).await;
    assert_eq!(body_json(resp).await["inn"], "7700");
}

#[tokio::test]
async fn create_rejects_empty_object_with_422() {
    let app = mock_server::app();
    let resp = send(&app, request("POST", "/v1/deal", "{}")).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"], json!(["at least one field is required"]));
}

#[tokio::test]
async fn create_rejects_malformed_json_with_400() {
    let app = mock_server::app();
    let resp = send(&app, request("POST", "/v1/deal", "{not json")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_unknown_id_returns_404() {
    let app = mock_server::app();
    let resp = send(&app, get("/v1/category/999")).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["message"], "category 999 not found");
}

#[tokio::test]
async fn update_merges_fields_and_keeps_id() {
    let api = MockApi::new(DEFAULT_TOKEN);
    let id = api.seed("goods", json!({"name": "Widget", "cost": 5.0}));
    let app = api.router();

    let resp = send(
        &app,
        request("PUT", &format!("/v1/goods/{id}"), r#"{"cost":7.5,"id":123}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await["items"][0].clone();
    assert_eq!(updated, json!({"id": id, "name": "Widget", "cost": 7.5}));
}

#[tokio::test]
async fn delete_removes_record_once() {
    let api = MockApi::new(DEFAULT_TOKEN);
    let id = api.seed("direction", json!({"name": "Retail"}));
    let app = api.router();
    let uri = format!("/v1/direction/{id}");

    let resp = send(&app, request("DELETE", &uri, "")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = send(&app, request("DELETE", &uri, "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- actions ---

#[tokio::test]
async fn action_echoes_name_and_payload() {
    let api = MockApi::new(DEFAULT_TOKEN);
    let id = api.seed("transaction", json!({"value": 100.0}));
    let app = api.router();

    let uri = format!("/v1/transaction/{id}/split");
    let resp = send(&app, request("POST", &uri, r#"{"parts":[60,40]}"#)).await;
    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["action"], "split");
    assert_eq!(body["payload"], json!({"parts": [60, 40]}));

    let uri = format!("/v1/transaction/{id}/merge/77");
    let resp = send(&app, request("POST", &uri, "")).await;
    let body = body_json(resp).await;
    assert_eq!(body["action"], "merge/77");
    assert_eq!(body["payload"], Value::Null);
}

#[tokio::test]
async fn action_on_missing_record_returns_404() {
    let app = mock_server::app();
    let resp = send(&app, request("POST", "/v1/deal/5/stage", "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- fault injection ---

#[tokio::test]
async fn queued_faults_are_served_in_order_and_counted() {
    let api = MockApi::new(DEFAULT_TOKEN);
    api.fail_next(&[503, 429]);
    let app = api.router();

    let resp = send(&app, get("/v1/category")).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let resp = send(&app, get("/v1/category")).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.headers()[http::header::RETRY_AFTER], "0");

    let resp = send(&app, get("/v1/category")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(api.hits(), 3);
}
