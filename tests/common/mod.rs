#![allow(dead_code)]

use axum::Router;
use chrono::Utc;
use frequency_quiz::models::user::UserData;
use frequency_quiz::services::api_client::ApiClient;
use serde_json::{json, Value as JsonValue};
use tokio::net::TcpListener;

pub const FREQUENCY_NAMES: [&str; 7] = [
    "Anchor", "Builder", "Catalyst", "Dreamer", "Empath", "Flow", "Guardian",
];

/// Serves `app` under `/api` on an ephemeral port and returns the base URL.
pub async fn spawn_backend(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = Router::new().nest("/api", app);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{}/api", addr)
}

pub fn client(base_url: &str, get_retries: u32) -> ApiClient {
    ApiClient::with_client(reqwest::Client::new(), base_url, get_retries)
}

pub fn questions_json(count: usize) -> JsonValue {
    let questions: Vec<JsonValue> = (0..count)
        .map(|i| {
            json!({
                "id": 100 + i as i64,
                "description": format!("Statement {}", i + 1),
                "frequencyId": (i % 7) as i64 + 1,
            })
        })
        .collect();
    JsonValue::Array(questions)
}

/// A stored response whose scores descend from Anchor (70) to Guardian (10).
pub fn response_json(id: &str, tier: Option<u8>) -> JsonValue {
    let frequencies: Vec<JsonValue> = FREQUENCY_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| {
            json!({
                "id": i as i64 + 1,
                "name": name,
                "value": 70.0 - 10.0 * i as f64,
                "description": format!("About {}", name),
            })
        })
        .collect();
    let mut body = json!({
        "id": id,
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "ada@example.com",
        "createdOn": "2024-03-05T10:15:00Z",
        "frequencies": frequencies,
    });
    if let Some(tier) = tier {
        body["tier"] = json!(tier);
    }
    body
}

pub fn user_data() -> UserData {
    UserData {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.com".into(),
        license_code: "TAC-2024".into(),
        consent: true,
        start_time: Utc::now(),
    }
}
