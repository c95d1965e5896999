mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use frequency_quiz::dto::admin_dto::ResponseListParams;
use frequency_quiz::error::Error;
use frequency_quiz::models::tier::Tier;
use frequency_quiz::services::admin_service::{AdminService, AdminSession};
use frequency_quiz::services::report_service::ReportPage;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};

#[derive(Clone)]
struct Admin {
    accepted: Arc<String>,
    hits: Arc<AtomicUsize>,
}

fn token(sub: &str, exp_offset_secs: i64) -> String {
    let claims = json!({
        "sub": sub,
        "exp": Utc::now().timestamp() + exp_offset_secs,
        "email": "admin@example.com",
        "cognito:groups": ["admins"],
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-signing-key"),
    )
    .expect("encode token")
}

fn stored_responses() -> Vec<JsonValue> {
    let mut grace = common::response_json("resp-2", Some(3));
    grace["firstName"] = json!("Grace");
    grace["lastName"] = json!("Hopper");
    grace["email"] = json!("grace@example.com");
    vec![
        common::response_json("resp-1", None),
        grace,
        common::response_json("resp-3", Some(7)),
    ]
}

fn authorized(admin: &Admin, headers: &HeaderMap) -> bool {
    admin.hits.fetch_add(1, Ordering::SeqCst);
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", admin.accepted))
        .unwrap_or(false)
}

async fn list(
    State(admin): State<Admin>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<JsonValue>) {
    if !authorized(&admin, &headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Token expired" })));
    }
    let limit: usize = params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(50);
    let items: Vec<JsonValue> = stored_responses()
        .into_iter()
        .filter(|r| match params.get("search") {
            Some(search) => r["firstName"]
                .as_str()
                .map(|n| n.contains(search.as_str()))
                .unwrap_or(false),
            None => true,
        })
        .take(limit)
        .collect();
    let total = items.len();
    (StatusCode::OK, Json(json!({ "items": items, "total": total })))
}

async fn detail(
    State(admin): State<Admin>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> (StatusCode, Json<JsonValue>) {
    if !authorized(&admin, &headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Token expired" })));
    }
    match stored_responses().into_iter().find(|r| r["id"] == id.as_str()) {
        Some(response) => (StatusCode::OK, Json(response)),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "Response not found" }))),
    }
}

async fn setup() -> (AdminService<frequency_quiz::services::api_client::ApiClient>, Admin, String) {
    let good = token("admin-1", 3600);
    let admin = Admin {
        accepted: Arc::new(good.clone()),
        hits: Arc::default(),
    };
    let app = Router::new()
        .route("/responses", get(list))
        .route("/responses/:id", get(detail))
        .with_state(admin.clone());
    let base_url = common::spawn_backend(app).await;
    (AdminService::new(common::client(&base_url, 0)), admin, good)
}

#[tokio::test]
async fn lists_and_exports_responses() {
    let (service, _, good) = setup().await;
    let mut session = AdminSession::new();
    let claims = session.sign_in(good).expect("sign in");
    assert_eq!(claims.groups, vec!["admins".to_string()]);

    let page = service
        .list_responses(&mut session, &ResponseListParams::default())
        .await
        .expect("list");
    assert_eq!(page.total, 3);
    assert_eq!(page.items[1].current_tier(), Tier::Three);
    assert_eq!(page.items[0].current_tier(), Tier::One);

    let params = ResponseListParams {
        search: Some("Grace".into()),
        ..ResponseListParams::default()
    };
    let page = service.list_responses(&mut session, &params).await.expect("search");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].full_name(), "Grace Hopper");

    let bytes = service
        .export_responses(&mut session, &ResponseListParams::default())
        .await
        .expect("export");
    assert!(bytes.starts_with(b"PK"));
}

#[tokio::test]
async fn previews_report_at_chosen_tier() {
    let (service, _, good) = setup().await;
    let mut session = AdminSession::new();
    session.sign_in(good).expect("sign in");

    let report = service
        .preview_report(&mut session, "resp-2", Tier::Three)
        .await
        .expect("preview");
    assert!(report.preview);
    assert_eq!(report.tier, Tier::Three);
    assert!(report.title.contains("Preview"));
    let names: Vec<&str> = report
        .pages
        .iter()
        .filter_map(|p| match p {
            ReportPage::Frequency { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["Anchor", "Builder", "Catalyst"]);

    let err = service
        .get_response(&mut session, "missing")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(session.is_signed_in());
}

#[tokio::test]
async fn rejected_token_clears_session() {
    let (service, admin, _) = setup().await;
    let mut session = AdminSession::new();
    session.sign_in(token("revoked-admin", 3600)).expect("sign in");

    let err = service
        .list_responses(&mut session, &ResponseListParams::default())
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!session.is_signed_in());
    assert!(session.claims().is_none());
    assert_eq!(admin.hits.load(Ordering::SeqCst), 1);

    // Signed out sessions fail locally without calling the backend.
    let err = service
        .get_response(&mut session, "resp-1")
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(admin.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_token_is_refused_at_sign_in() {
    let mut session = AdminSession::new();
    let err = session.sign_in(token("admin-1", -3600)).unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!session.is_signed_in());
}
