// Integration tests for the HTTP control API
//
// Requests go straight through the router with `oneshot`; live sessions are
// simulated by registering a control channel in the shared state.

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use voice_bridge::config::ProvidersConfig;
use voice_bridge::{create_router, AppState, Config, ControlMessage, ProviderRegistry};

fn app_state() -> AppState {
    AppState::new(
        Config::default(),
        ProviderRegistry::with_builtin(&ProvidersConfig::default()),
    )
}

async fn body_json(response: axum::response::Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn post_json(uri: &str, body: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))?)
}

#[tokio::test]
async fn test_health() -> Result<()> {
    let app = create_router(app_state());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&bytes[..], b"OK");

    Ok(())
}

#[tokio::test]
async fn test_list_sessions() -> Result<()> {
    let state = app_state();
    let (tx, _rx) = mpsc::channel(1);
    {
        let mut sessions = state.sessions.write().await;
        sessions.insert("MZ-b".to_string(), tx.clone());
        sessions.insert("MZ-a".to_string(), tx);
    }

    let response = create_router(state)
        .oneshot(Request::builder().uri("/sessions").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await?;
    assert_eq!(json["sessions"], serde_json::json!(["MZ-a", "MZ-b"]));

    Ok(())
}

#[tokio::test]
async fn test_say_forwards_to_live_session() -> Result<()> {
    let state = app_state();
    let (tx, mut rx) = mpsc::channel(1);
    state.sessions.write().await.insert("MZ-live".to_string(), tx);

    let response = create_router(state)
        .oneshot(post_json("/sessions/MZ-live/say", r#"{"text":"hello"}"#)?)
        .await?;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await?;
    assert_eq!(json["session_id"], "MZ-live");
    assert_eq!(json["status"], "accepted");

    assert_eq!(
        rx.recv().await,
        Some(ControlMessage::Say {
            text: "hello".to_string()
        })
    );

    Ok(())
}

#[tokio::test]
async fn test_say_rejects_empty_text() -> Result<()> {
    let state = app_state();
    let (tx, _rx) = mpsc::channel(1);
    state.sessions.write().await.insert("MZ-live".to_string(), tx);

    let response = create_router(state)
        .oneshot(post_json("/sessions/MZ-live/say", r#"{"text":"   "}"#)?)
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_hangup_unknown_session_is_not_found() -> Result<()> {
    let response = create_router(app_state())
        .oneshot(post_json("/sessions/MZ-missing/hangup", "")?)
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await?;
    assert!(json["error"].as_str().unwrap_or_default().contains("MZ-missing"));

    Ok(())
}

#[tokio::test]
async fn test_hangup_on_finished_session_is_not_found() -> Result<()> {
    let state = app_state();
    let (tx, rx) = mpsc::channel(1);
    state.sessions.write().await.insert("MZ-ended".to_string(), tx);
    drop(rx);

    let response = create_router(state)
        .oneshot(post_json("/sessions/MZ-ended/hangup", "")?)
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_reused_stream_id_does_not_replace_live_session() -> Result<()> {
    let state = app_state();
    let (first_tx, mut first_rx) = mpsc::channel(1);
    let (second_tx, _second_rx) = mpsc::channel(1);

    assert!(state.register_session("MZ-dup", first_tx.clone()).await);
    assert!(!state.register_session("MZ-dup", second_tx.clone()).await);

    // The second connection finishing must not withdraw the first one's entry
    state.unregister_session("MZ-dup", &second_tx).await;
    assert!(state.sessions.read().await.contains_key("MZ-dup"));

    let response = create_router(state.clone())
        .oneshot(post_json("/sessions/MZ-dup/hangup", "")?)
        .await?;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(first_rx.recv().await, Some(ControlMessage::Hangup));

    state.unregister_session("MZ-dup", &first_tx).await;
    assert!(!state.sessions.read().await.contains_key("MZ-dup"));

    Ok(())
}

#[tokio::test]
async fn test_stream_id_can_be_reused_once_the_session_ended() -> Result<()> {
    let state = app_state();
    let (old_tx, old_rx) = mpsc::channel(1);
    let (new_tx, _new_rx) = mpsc::channel(1);

    assert!(state.register_session("MZ-again", old_tx).await);
    drop(old_rx);

    assert!(state.register_session("MZ-again", new_tx.clone()).await);
    let sessions = state.sessions.read().await;
    assert!(sessions["MZ-again"].same_channel(&new_tx));

    Ok(())
}
