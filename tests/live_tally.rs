use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use futures::StreamExt;
use pollcast::{
    app,
    db::memory_store::MemoryStore,
    services::subscribers::Registration,
    state::AppState,
    utils::config::{Config, StoreBackend},
};
use serde_json::{json, Value};
use tokio::time::timeout;
use tower::ServiceExt;

fn memory_state() -> AppState {
    let config = Config {
        store_backend: StoreBackend::Memory,
        ..Config::default()
    };
    AppState::new(Arc::new(MemoryStore::new()), config)
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_user(router: &Router, name: &str) -> String {
    let (status, user) = call(
        router,
        "POST",
        "/users",
        Some(json!({
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase()),
            "passwordHash": "not-a-real-hash",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    user["id"].as_str().unwrap().to_string()
}

async fn next_tally(registration: &mut Registration) -> Value {
    let payload = timeout(Duration::from_secs(1), registration.outbox.recv())
        .await
        .expect("no broadcast arrived")
        .expect("subscriber was closed");
    serde_json::from_str(&payload).unwrap()
}

#[tokio::test]
async fn test_red_blue_scenario() {
    let state = memory_state();
    let router = app(state.clone());
    let mut observer = state.registry.register();

    let u1 = create_user(&router, "U1").await;
    let u2 = create_user(&router, "U2").await;

    let (status, poll) = call(
        &router,
        "POST",
        "/polls",
        Some(json!({ "question": "P1", "options": ["Red", "Blue"], "creatorId": u1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let poll_id = poll["id"].as_str().unwrap().to_string();
    let red = poll["options"][0]["id"].as_str().unwrap().to_string();
    let blue = poll["options"][1]["id"].as_str().unwrap().to_string();
    assert_eq!(poll["options"][0]["text"], "Red");
    assert_eq!(poll["options"][0]["pollId"], poll_id.as_str());

    // U1 votes Red.
    let (status, vote) = call(
        &router,
        "POST",
        "/vote",
        Some(json!({ "userId": u1, "pollOptionId": red })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(vote["pollOptionId"], red.as_str());

    let tally = next_tally(&mut observer).await;
    assert_eq!(
        tally,
        json!({ "pollId": poll_id, "results": [{ "text": "Red", "votes": 1 }, { "text": "Blue", "votes": 0 }] })
    );

    // U1 votes Red again: conflict, no broadcast, tally unchanged.
    let (status, body) = call(
        &router,
        "POST",
        "/vote",
        Some(json!({ "userId": u1, "pollOptionId": red })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");

    let (status, tally) = call(&router, "GET", &format!("/polls/{poll_id}/results"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tally["results"][0]["votes"], 1);
    assert_eq!(tally["results"][1]["votes"], 0);

    // U2 votes Blue.
    let (status, _) = call(
        &router,
        "POST",
        "/vote",
        Some(json!({ "userId": u2, "pollOptionId": blue })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // The next broadcast is U2's; the duplicate produced none.
    let tally = next_tally(&mut observer).await;
    assert_eq!(
        tally,
        json!({ "pollId": poll_id, "results": [{ "text": "Red", "votes": 1 }, { "text": "Blue", "votes": 1 }] })
    );
    assert!(observer.outbox.try_recv().is_err());
}

#[tokio::test]
async fn test_unregistered_observer_receives_nothing() {
    let state = memory_state();
    let router = app(state.clone());

    let departed = state.registry.register();
    state.registry.unregister(departed.id);
    let Registration { mut outbox, .. } = departed;

    let user = create_user(&router, "Ada").await;
    let (_, poll) = call(
        &router,
        "POST",
        "/polls",
        Some(json!({ "question": "Tea or coffee?", "options": ["Tea", "Coffee"], "creatorId": user })),
    )
    .await;
    let option = poll["options"][1]["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &router,
        "POST",
        "/vote",
        Some(json!({ "userId": user, "pollOptionId": option })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    assert_eq!(outbox.recv().await, None);
}

#[tokio::test]
async fn test_results_stream_pushes_tallies_and_unregisters_on_drop() {
    let state = memory_state();
    let router = app(state.clone());

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/polls/results/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/event-stream");
    assert_eq!(state.registry.len(), 1);

    let mut events = response.into_body().into_data_stream();

    let user = create_user(&router, "Ada").await;
    let (_, poll) = call(
        &router,
        "POST",
        "/polls",
        Some(json!({ "question": "Tea or coffee?", "options": ["Tea", "Coffee"], "creatorId": user })),
    )
    .await;
    let coffee = poll["options"][1]["id"].as_str().unwrap().to_string();
    let (status, _) = call(
        &router,
        "POST",
        "/vote",
        Some(json!({ "userId": user, "pollOptionId": coffee })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let frame = timeout(Duration::from_secs(1), events.next())
        .await
        .expect("no event arrived")
        .expect("stream ended")
        .unwrap();
    let frame = String::from_utf8(frame.to_vec()).unwrap();
    let data = frame.strip_prefix("data: ").unwrap().trim_end();
    let tally: Value = serde_json::from_str(data).unwrap();
    assert_eq!(tally["pollId"], poll["id"]);
    assert_eq!(tally["results"][1], json!({ "text": "Coffee", "votes": 1 }));

    drop(events);
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn test_vote_error_statuses() {
    let state = memory_state();
    let router = app(state);
    let user = create_user(&router, "Ada").await;

    let (status, _) = call(
        &router,
        "POST",
        "/vote",
        Some(json!({ "userId": user, "pollOptionId": "0123456789abcdef01234567" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &router,
        "POST",
        "/vote",
        Some(json!({ "userId": user, "pollOptionId": "not-an-id" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&router, "GET", "/polls/0123456789abcdef01234567/results", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_users_and_polls_listing() {
    let state = memory_state();
    let router = app(state);

    let ada = create_user(&router, "Ada").await;

    let (status, _) = call(
        &router,
        "POST",
        "/users",
        Some(json!({ "name": "Ada again", "email": "ada@example.com", "passwordHash": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, users) = call(&router, "GET", "/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert!(users[0].get("passwordHash").is_none());

    let (status, _) = call(
        &router,
        "POST",
        "/polls",
        Some(json!({ "question": "Only one?", "options": ["Yes"], "creatorId": ada })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &router,
        "POST",
        "/polls",
        Some(json!({ "question": "Orphan", "options": ["a", "b"], "creatorId": "0123456789abcdef01234567" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    call(
        &router,
        "POST",
        "/polls",
        Some(json!({ "question": "Lunch?", "options": ["Pizza", "Salad"], "creatorId": ada })),
    )
    .await;

    let (status, polls) = call(&router, "GET", "/polls", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(polls.as_array().unwrap().len(), 1);
    assert_eq!(polls[0]["creator"]["name"], "Ada");
    assert_eq!(polls[0]["options"][1]["text"], "Salad");
}

#[tokio::test]
async fn test_health_check() {
    let router = app(memory_state());

    let (status, body) = call(&router, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["subscribers"], 0);
    assert!(body["uptimeSeconds"].is_u64());
}
