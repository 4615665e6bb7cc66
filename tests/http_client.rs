use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use vote_console::api::{ControlPlane, HttpControlPlane};
use vote_console::model::{ClientConfig, ReplyStatus};
use vote_console::ClientError;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpControlPlane {
    let cfg = ClientConfig {
        base_url: format!("{}/", server.uri()),
        request_timeout: Duration::from_secs(2),
        ..Default::default()
    };
    HttpControlPlane::new(&cfg).expect("client builds")
}

fn snapshot_body(completed: u64, running: bool) -> serde_json::Value {
    json!({
        "is_running": running,
        "current_status": "Voting",
        "total_votes": 50,
        "completed_votes": completed,
        "success_count": completed,
        "error_count": 0,
        "log_messages": ["Starting vote attempt 1 of 50..."]
    })
}

#[tokio::test]
async fn start_posts_form_and_decodes_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/start_voting"))
        .and(body_string_contains("num_votes=50"))
        .and(body_string_contains("use_proxies=on"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "Started voting process for 50 votes",
            "session_id": "1700000000"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server)
        .start(vec![
            ("num_votes".into(), "50".into()),
            ("use_proxies".into(), "on".into()),
        ])
        .await
        .expect("start ok");
    assert_eq!(reply.status, ReplyStatus::Success);
    assert_eq!(
        reply.message.as_deref(),
        Some("Started voting process for 50 votes")
    );
}

#[tokio::test]
async fn start_rejection_body_is_read_from_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/start_voting"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "error",
            "message": "Please enter a positive number of votes"
        })))
        .mount(&server)
        .await;

    let reply = client(&server)
        .start(vec![("num_votes".into(), "1".into())])
        .await
        .expect("decoded reply");
    assert_eq!(reply.status, ReplyStatus::Error);
    assert_eq!(
        reply.message_or(""),
        "Please enter a positive number of votes"
    );
}

#[tokio::test]
async fn non_json_failure_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stop_voting"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client(&server).stop().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }), "{err:?}");
    assert!(err.to_string().contains("502"));
}

#[tokio::test]
async fn status_404_with_error_wrapper_is_no_active_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/check_status"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": "error",
            "message": "No active voting session found"
        })))
        .mount(&server)
        .await;

    let err = client(&server).status().await.unwrap_err();
    match err {
        ClientError::NoActiveSession(m) => assert_eq!(m, "No active voting session found"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn status_with_missing_fields_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/check_status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_running": true,
            "completed_votes": 3
        })))
        .mount(&server)
        .await;

    let err = client(&server).status().await.unwrap_err();
    assert!(matches!(err, ClientError::MalformedSnapshot(_)), "{err:?}");
}

#[tokio::test]
async fn session_cookie_is_carried_to_later_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/start_voting"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=abc123; Path=/")
                .set_body_json(json!({"status": "success", "message": "ok"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/check_status"))
        .and(header("cookie", "session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body(7, true)))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    api.start(vec![("num_votes".into(), "50".into())])
        .await
        .expect("start ok");
    let snap = api.status().await.expect("status ok with cookie");
    assert_eq!(snap.completed_votes, 7);
    assert_eq!(snap.log_messages.len(), 1);
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let cfg = ClientConfig {
        // Port 9 (discard) is closed on test machines.
        base_url: "http://127.0.0.1:9".into(),
        request_timeout: Duration::from_secs(2),
        ..Default::default()
    };
    let api = HttpControlPlane::new(&cfg).unwrap();
    let err = api.status().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }), "{err:?}");
}
