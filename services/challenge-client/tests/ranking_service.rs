//! Ranking client tests against an in-process ranking service
//!
//! The fake service speaks the real wire format: camelCase entries,
//! millisecond fields sometimes sent as strings, naive UTC dates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use challenge_client::display::{Tone, format_ratio};
use challenge_client::leaderboard::LeaderboardView;
use challenge_client::models::{CHALLENGE_TEXT, ChallengeMessage};
use challenge_client::names::{NameCache, NoNames, OWN_ACCOUNT_LABEL};
use challenge_client::signer::PresignedSigner;
use challenge_client::{ChallengeSession, ClientError, RankingClient, SubmissionError};
use serde_json::{Value, json};
use types::leaderboard::{LeaderboardOrderBy, SubmitMessageRequest};

#[derive(Clone, Default)]
struct FakeService {
    submissions: Arc<Mutex<Vec<SubmitMessageRequest>>>,
    leaderboard_queries: Arc<Mutex<Vec<String>>>,
    leaderboard_down: Arc<AtomicBool>,
}

fn entry(address: &str, position: u64, reaction: i64, flash: i64, request_date: &str) -> Value {
    json!({
        "address": address,
        "requestDate": request_date,
        "submitDate": "2025-02-17T09:30:05.912000",
        "flashBlockMillis": flash.to_string(),
        "blockMillis": "1830",
        "reactionMillis": reaction,
        "blockNumber": 22031337,
        "transactionHash": format!("0x{position:064x}"),
        "position": position,
        "ratio": reaction as f64 / flash as f64,
    })
}

async fn submit(
    State(service): State<FakeService>,
    Json(request): Json<SubmitMessageRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if request.signature == "0xbad" {
        return Err((StatusCode::UNAUTHORIZED, "Invalid signature".to_string()));
    }

    let message: Value = serde_json::from_str(&request.message)
        .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid message".to_string()))?;
    let request_time = message["requestTime"].as_str().unwrap_or_default().trim_end_matches('Z').to_string();
    service.submissions.lock().unwrap().push(request);

    Ok(Json(json!({ "entry": entry("0x8f3b2c41d6c6e5a09f1b3bd1a3f5d2e4c7b9a011", 7, 870, 410, &request_time) })))
}

async fn leaderboard(
    State(service): State<FakeService>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let order_by = params.get("order_by").cloned().unwrap_or_default();
    service.leaderboard_queries.lock().unwrap().push(order_by.clone());

    if service.leaderboard_down.load(Ordering::SeqCst) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    // Deliberately not sorted by any column the client could re-derive
    let entries = match order_by.as_str() {
        "reaction_millis" => vec![
            entry("0x2222222222222222222222222222222222222222", 1, 300, 900, "2025-02-17T09:00:00"),
            entry("0x1111111111111111111111111111111111111111", 2, 2500, 400, "2025-02-17T08:00:00"),
        ],
        _ => vec![
            entry("0x1111111111111111111111111111111111111111", 1, 2500, 400, "2025-02-17T08:00:00"),
            entry("0x2222222222222222222222222222222222222222", 150, 300, 900, "2025-02-17T09:00:00"),
            entry("0x3333333333333333333333333333333333333333", 12, 1200, 500, "2025-02-17T10:00:00"),
        ],
    };
    Ok(Json(json!({ "entries": entries })))
}

async fn spawn_service() -> (String, FakeService) {
    let service = FakeService::default();
    let app = Router::new()
        .route("/v1/submit", post(submit))
        .route("/v1/leaderboard", get(leaderboard))
        .with_state(service.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), service)
}

#[tokio::test]
async fn test_attempt_surfaces_entry_unmodified() {
    let (url, service) = spawn_service().await;
    let session = ChallengeSession::new(RankingClient::new(url).unwrap(), PresignedSigner::new("0xsig"));

    let attempt = session.attempt().await.unwrap();
    assert!(!session.is_submitting());

    let entry = &attempt.entry;
    assert_eq!(entry.address, "0x8f3b2c41d6c6e5a09f1b3bd1a3f5d2e4c7b9a011");
    assert_eq!(entry.position, 7);
    assert_eq!(entry.reaction_millis, 870);
    assert_eq!(entry.flash_block_millis, 410);
    assert_eq!(entry.block_millis, 1830);
    assert_eq!(entry.block_number, 22031337);
    assert_eq!(format_ratio(entry.ratio), "2.12");

    // The service saw the exact payload that was signed
    let submissions = service.submissions.lock().unwrap().clone();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].signature, "0xsig");
    let sent: ChallengeMessage = serde_json::from_str(&submissions[0].message).unwrap();
    assert_eq!(sent.message, CHALLENGE_TEXT);
    assert_eq!(
        sent.request_time.timestamp_millis(),
        attempt.message.request_time.timestamp_millis()
    );
    assert!(submissions[0].message.contains("\"requestTime\":\""));
    assert!(submissions[0].message.ends_with("Z\"}"));

    // Naive server dates round-trip to the request time
    assert_eq!(
        entry.request_date_utc().unwrap().timestamp_millis(),
        attempt.message.request_time.timestamp_millis()
    );
}

#[tokio::test]
async fn test_rejected_submission_can_be_retried() {
    let (url, _service) = spawn_service().await;
    let client = RankingClient::new(url).unwrap();

    let rejected = ChallengeSession::new(client.clone(), PresignedSigner::new("0xbad"));
    let err = rejected.attempt().await.unwrap_err();
    match err {
        SubmissionError::Client(ClientError::Status { status, body }) => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(body, "Invalid signature");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!rejected.is_submitting());
    assert!(rejected.attempt().await.is_err());

    let accepted = ChallengeSession::new(client, PresignedSigner::new("0xsig"));
    assert!(accepted.attempt().await.is_ok());
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = ChallengeSession::new(
        RankingClient::new(format!("http://{addr}")).unwrap(),
        PresignedSigner::new("0xsig"),
    );
    let err = session.attempt().await.unwrap_err();
    assert!(matches!(err, SubmissionError::Client(ClientError::Transport(_))));
    assert!(!session.is_submitting());
}

#[tokio::test]
async fn test_leaderboard_fetched_only_on_order_change() {
    let (url, service) = spawn_service().await;
    let mut view = LeaderboardView::new(RankingClient::new(url).unwrap());

    view.load().await.unwrap();
    view.load().await.unwrap();
    view.set_order(LeaderboardOrderBy::Ratio).await.unwrap();
    assert_eq!(view.fetches(), 1);

    view.set_order(LeaderboardOrderBy::ReactionMillis).await.unwrap();
    assert_eq!(
        *service.leaderboard_queries.lock().unwrap(),
        vec!["ratio".to_string(), "reaction_millis".to_string()]
    );
    assert_eq!(view.loaded_order(), Some(LeaderboardOrderBy::ReactionMillis));

    // Explicit refresh always fetches
    view.refresh().await.unwrap();
    assert_eq!(view.fetches(), 3);
}

#[tokio::test]
async fn test_leaderboard_kept_in_service_order() {
    let (url, _service) = spawn_service().await;
    let mut view = LeaderboardView::new(RankingClient::new(url).unwrap());
    view.load().await.unwrap();

    let positions: Vec<u64> = view.entries().iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![1, 150, 12]);
}

#[tokio::test]
async fn test_failed_fetch_keeps_last_entries() {
    let (url, service) = spawn_service().await;
    let mut view = LeaderboardView::new(RankingClient::new(url).unwrap());
    view.load().await.unwrap();
    let before = view.entries().to_vec();

    service.leaderboard_down.store(true, Ordering::SeqCst);
    let err = view.set_order(LeaderboardOrderBy::SubmitDate).await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(503));

    assert_eq!(view.entries(), before.as_slice());
    assert_eq!(view.order_by(), LeaderboardOrderBy::SubmitDate);
    assert_eq!(view.loaded_order(), Some(LeaderboardOrderBy::Ratio));

    // Service back: the pending order is fetched on the next load
    service.leaderboard_down.store(false, Ordering::SeqCst);
    view.load().await.unwrap();
    assert_eq!(view.loaded_order(), Some(LeaderboardOrderBy::SubmitDate));
}

#[tokio::test]
async fn test_rows_carry_tones_and_fallback_names() {
    let (url, _service) = spawn_service().await;
    let mut view = LeaderboardView::new(RankingClient::new(url).unwrap());
    view.load().await.unwrap();

    let mut names = NameCache::new(NoNames, 16);
    let rows = view.rows(&mut names, None).await;

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].name, "0x11...111");
    assert_eq!(rows[0].position.tone, Tone::Success);
    assert_eq!(rows[0].reaction.tone, Tone::Error);
    assert_eq!(rows[0].ratio.text, "6.25");
    assert_eq!(rows[0].ratio.tone, Tone::Default);

    assert_eq!(rows[1].position.tone, Tone::Default);
    assert_eq!(rows[1].reaction.tone, Tone::Success);
    assert_eq!(rows[1].ratio.tone, Tone::Success);

    assert_eq!(rows[2].position.tone, Tone::MutedSuccess);
    assert_eq!(rows[2].reaction.tone, Tone::Warning);
}

#[tokio::test]
async fn test_own_row_is_labelled() {
    let (url, _service) = spawn_service().await;
    let mut view = LeaderboardView::new(RankingClient::new(url).unwrap());
    view.load().await.unwrap();

    let mut names = NameCache::new(NoNames, 16);
    let rows = view
        .rows(&mut names, Some("0x2222222222222222222222222222222222222222"))
        .await;

    let labels: Vec<&str> = rows.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(labels, vec!["0x11...111", OWN_ACCOUNT_LABEL, "0x33...333"]);
}
