use std::collections::HashMap;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use dojo_common::{ChallengeRef, Service};
use serde_json::{json, Value};

use crate::probe::{HttpProbe, Probe, ProbeOutcome};
use crate::types::{SolveStatus, WorkspaceQuery};
use crate::{ApiError, DojoApi};

use super::{HttpApiConfig, HttpDojoApi};

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base: &str) -> HttpDojoApi {
    HttpDojoApi::new(HttpApiConfig::new(base)).unwrap()
}

async fn dojos(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != "Bearer tok-1" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "errors": ["Authentication required"]})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"success": true, "dojos": [
            {"id": "intro", "name": "Intro", "description": "Start here", "official": true},
            {"id": "extra", "name": "Extra"}
        ]})),
    )
}

async fn solves(
    Path(dojo): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let user = params.get("username").cloned().unwrap_or_else(|| "all".into());
    Json(json!({"success": true, "solves": [
        {"module_id": dojo, "challenge_id": user, "timestamp": "2024-05-01T10:00:00Z", "user_id": 7}
    ]}))
}

async fn solve(
    Path((_dojo, _module, challenge)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let submission = body["submission"].as_str().unwrap_or_default();
    match (challenge.as_str(), submission) {
        ("done", _) => Json(json!({"success": true, "status": "already_solved"})),
        (_, "pwn.college{test}") => Json(json!({"success": true, "status": "correct"})),
        _ => Json(json!({"success": false, "status": "incorrect"})),
    }
}

async fn docker(Json(body): Json<Value>) -> Json<Value> {
    if body["challenge"] == "locked" {
        return Json(json!({"success": false, "error": "Challenge is locked"}));
    }
    if body["practice"].as_bool().is_none() || body["dojo"].as_str().is_none() {
        return Json(json!({"success": false, "error": "bad request"}));
    }
    Json(json!({"success": true}))
}

async fn workspace(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let service = params.get("service").cloned().unwrap_or_default();
    Json(json!({
        "active": true,
        "iframe_src": format!("/workspace/{service}/"),
        "current_challenge": {"dojo_id": "intro", "module_id": "shell", "challenge_id": "cat"}
    }))
}

async fn login(Json(body): Json<Value>) -> Json<Value> {
    if body["password"] == "hunter2" {
        Json(json!({"success": true, "data": {"token": "tok-1", "user": {"username": "hacker"}}}))
    } else {
        Json(json!({"success": false, "errors": {"password": ["Incorrect password"]}}))
    }
}

fn router() -> Router {
    Router::new()
        .route("/dojos", get(dojos))
        .route("/dojos/:dojo/solves", get(solves))
        .route("/dojos/:dojo/:module/:challenge/solve", post(solve))
        .route(
            "/dojos/:dojo/:module/:challenge/description",
            get(|| async { Json(json!({"success": true, "description": "Read the flag."})) }),
        )
        .route("/docker", post(docker))
        .route("/workspace", get(workspace))
        .route("/workspace/terminate", post(|| async { Json(json!({"success": true})) }))
        .route(
            "/workspace/reset_home",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "upstream exploded".to_string(),
                )
            }),
        )
        .route("/auth/login", post(login))
        .route("/garbage", get(|| async { "not json at all" }))
        .route("/ready", get(|| async { "ok" }))
        .route(
            "/booting",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "starting") }),
        )
}

#[tokio::test]
async fn rejected_without_token_then_ok_after_login() {
    let base = spawn(router()).await;
    let api = client(&base);

    let err = api.list_dojos().await.unwrap_err();
    assert_eq!(err, ApiError::Rejected("Authentication required".into()));

    let session = api.login("hacker", "hunter2").await.unwrap();
    assert_eq!(session.username.as_deref(), Some("hacker"));
    assert_eq!(api.token().as_deref(), Some("tok-1"));

    let dojos = api.list_dojos().await.unwrap();
    assert_eq!(dojos.len(), 2);
    assert!(dojos[0].official);
    assert!(!dojos[1].official);
}

#[tokio::test]
async fn configured_token_is_sent() {
    let base = spawn(router()).await;
    let api = HttpDojoApi::new(HttpApiConfig::new(&base).with_token("tok-1")).unwrap();
    assert!(api.list_dojos().await.is_ok());

    api.logout();
    assert!(api.token().is_none());
    assert!(api.list_dojos().await.is_err());
}

#[tokio::test]
async fn failed_login_surfaces_field_errors() {
    let base = spawn(router()).await;
    let api = client(&base);
    let err = api.login("hacker", "wrong").await.unwrap_err();
    assert_eq!(err, ApiError::Rejected("Incorrect password".into()));
    assert!(api.token().is_none());
}

#[tokio::test]
async fn solves_pass_username_query() {
    let base = spawn(router()).await;
    let api = client(&base);

    let all = api.list_solves("intro", None).await.unwrap();
    assert_eq!(all[0].challenge_id, "all");
    assert_eq!(all[0].user_id.as_deref(), Some("7"));

    let mine = api.list_solves("intro", Some("hacker")).await.unwrap();
    assert_eq!(mine[0].challenge_id, "hacker");
}

#[tokio::test]
async fn submit_solve_maps_statuses() {
    let base = spawn(router()).await;
    let api = client(&base);
    let target = ChallengeRef::new("intro", "shell", "cat");

    assert_eq!(
        api.submit_solve(&target, "pwn.college{test}").await.unwrap(),
        SolveStatus::Correct
    );
    assert_eq!(
        api.submit_solve(&target, "pwn.college{nope}").await.unwrap(),
        SolveStatus::Incorrect
    );
    let done = ChallengeRef::new("intro", "shell", "done");
    assert_eq!(
        api.submit_solve(&done, "anything").await.unwrap(),
        SolveStatus::AlreadySolved
    );
}

#[tokio::test]
async fn description_is_returned() {
    let base = spawn(router()).await;
    let api = client(&base);
    let text = api
        .challenge_description(&ChallengeRef::new("intro", "shell", "cat"))
        .await
        .unwrap();
    assert_eq!(text, "Read the flag.");
}

#[tokio::test]
async fn start_challenge_success_and_rejection() {
    let base = spawn(router()).await;
    let api = client(&base);

    api.start_challenge(&ChallengeRef::new("intro", "shell", "cat"), true)
        .await
        .unwrap();

    let err = api
        .start_challenge(&ChallengeRef::new("intro", "shell", "locked"), false)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Rejected("Challenge is locked".into()));
}

#[tokio::test]
async fn workspace_status_sends_service_query() {
    let base = spawn(router()).await;
    let api = client(&base);

    let status = api
        .workspace_status(&WorkspaceQuery::for_service(Service::Desktop).with_theme("dark"))
        .await
        .unwrap();
    assert!(status.active);
    assert_eq!(status.iframe_src.as_deref(), Some("/workspace/desktop/"));
    assert_eq!(
        status.current_challenge.unwrap().target(),
        ChallengeRef::new("intro", "shell", "cat")
    );
}

#[tokio::test]
async fn unstructured_server_error_is_http() {
    let base = spawn(router()).await;
    let api = client(&base);
    api.terminate_workspace().await.unwrap();

    match api.reset_home().await.unwrap_err() {
        ApiError::Http { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_body_is_parse_error() {
    let base = spawn(router()).await;
    let api = client(&base);
    let err = api.get_value("/garbage", &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::Parse(_)));
}

#[tokio::test]
async fn closed_port_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(&format!("http://{addr}"));
    let err = api.list_dojos().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[tokio::test]
async fn http_probe_classifies_responses() {
    let base = spawn(router()).await;
    let probe = HttpProbe::new(std::time::Duration::from_secs(2)).unwrap();

    assert_eq!(probe.probe(&format!("{base}/ready")).await, ProbeOutcome::Reachable);
    assert_eq!(probe.probe(&format!("{base}/booting")).await, ProbeOutcome::NotReady);
    assert_eq!(probe.probe(&format!("{base}/missing")).await, ProbeOutcome::NotReady);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    assert_eq!(
        probe.probe(&format!("http://{addr}/")).await,
        ProbeOutcome::Unverifiable
    );
}
