use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use vote_console::api::{ControlPlane, HttpControlPlane};
use vote_console::model::{ClientConfig, JobForm, SessionEvent, SessionState};
use vote_console::orchestrator::{run_controller, UiCommand};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn snapshot(completed: u64, running: bool, logs: &[&str]) -> serde_json::Value {
    json!({
        "is_running": running,
        "current_status": format!("Vote {completed} done"),
        "total_votes": 50,
        "completed_votes": completed,
        "success_count": completed,
        "error_count": 0,
        "log_messages": logs,
    })
}

async fn mount_start(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/start_voting"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "Started voting process for 50 votes"
        })))
        .mount(server)
        .await;
}

async fn mount_status_once(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/check_status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

struct Collected {
    stats: Vec<String>,
    states: Vec<SessionState>,
    log: Vec<String>,
}

/// Submit one job and collect events until the session finishes.
async fn drive(server: &MockServer) -> Collected {
    let cfg = ClientConfig {
        base_url: server.uri(),
        poll_interval: Duration::from_millis(25),
        ..Default::default()
    };
    let api: Arc<dyn ControlPlane> = Arc::new(HttpControlPlane::new(&cfg).unwrap());
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let ctrl = tokio::spawn(async move { run_controller(&cfg, api, event_tx, cmd_rx).await });

    cmd_tx.send(UiCommand::Submit(JobForm::new("50"))).unwrap();

    let mut out = Collected {
        stats: Vec::new(),
        states: Vec::new(),
        log: Vec::new(),
    };
    let collect = async {
        while let Some(ev) = event_rx.recv().await {
            match ev {
                SessionEvent::Progress(u) => out.stats.push(u.view.stats_text),
                SessionEvent::State(s) => out.states.push(s),
                SessionEvent::LogCleared => out.log.clear(),
                SessionEvent::LogAppended(mut l) => out.log.append(&mut l),
                SessionEvent::Finished(_) => break,
                SessionEvent::Status(_) => {}
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(10), collect)
        .await
        .expect("session finished in time");

    cmd_tx.send(UiCommand::Quit).unwrap();
    ctrl.await.unwrap().unwrap();
    out
}

#[tokio::test]
async fn job_progresses_to_completion_over_http() {
    let server = MockServer::start().await;
    mount_start(&server).await;
    mount_status_once(&server, snapshot(10, true, &["Vote 1 completed successfully!"])).await;
    mount_status_once(
        &server,
        snapshot(
            30,
            true,
            &["Vote 1 completed successfully!", "Vote 2 completed successfully!"],
        ),
    )
    .await;
    mount_status_once(
        &server,
        snapshot(
            50,
            false,
            &["Vote 1 completed successfully!", "Vote 2 completed successfully!"],
        ),
    )
    .await;

    let out = drive(&server).await;

    assert_eq!(
        out.stats,
        vec!["0/0 votes", "10/50 votes", "30/50 votes", "50/50 votes"]
    );
    assert_eq!(
        out.states,
        vec![
            SessionState::Starting,
            SessionState::Running,
            SessionState::Terminal
        ]
    );
    assert_eq!(
        out.log,
        vec![
            "Started voting process: Started voting process for 50 votes",
            "Vote 1 completed successfully!",
            "Vote 2 completed successfully!",
            "Voting process completed",
        ]
    );

    // Polling stopped with the third snapshot.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let polls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/check_status")
        .count();
    assert_eq!(polls, 3);
}

#[tokio::test]
async fn missing_session_ends_polling_over_http() {
    let server = MockServer::start().await;
    mount_start(&server).await;
    Mock::given(method("GET"))
        .and(path("/check_status"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": "error",
            "message": "No active voting session found"
        })))
        .mount(&server)
        .await;

    let out = drive(&server).await;

    assert_eq!(out.states.last(), Some(&SessionState::Idle));
    assert!(out.states.last().unwrap().affordances().submit_enabled);
    assert_eq!(
        out.log.last().map(String::as_str),
        Some("Error: No active voting session found")
    );
}

#[tokio::test]
async fn batch_info_shows_in_stats() {
    let server = MockServer::start().await;
    mount_start(&server).await;
    let mut body = snapshot(20, false, &[]);
    body["current_batch"] = json!(2);
    body["total_batches"] = json!(5);
    mount_status_once(&server, body).await;

    let out = drive(&server).await;
    assert_eq!(out.stats.last().unwrap(), "20/50 votes (Batch 2/5)");
}
