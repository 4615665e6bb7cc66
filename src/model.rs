use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of log lines kept in the local view.
pub const DEFAULT_MAX_LOG_LINES: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub max_log_lines: usize,
    #[serde(default)]
    pub dedup: DedupStrategy,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".into(),
            poll_interval: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(10),
            max_log_lines: DEFAULT_MAX_LOG_LINES,
            dedup: DedupStrategy::Content,
            user_agent: format!("vote-console/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// How server log lines are matched against what the view already holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupStrategy {
    /// Compare message text against everything absorbed during the job.
    #[default]
    Content,
    /// Trust the server log to be append-only and take the unseen suffix.
    Length,
}

/// Parameters submitted to `/start_voting`.
///
/// `num_votes` is kept as raw text, the way a form field arrives; the session
/// validates it before anything goes on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobForm {
    pub num_votes: String,
    #[serde(default)]
    pub extra: Vec<(String, String)>,
}

impl JobForm {
    pub fn new(num_votes: impl Into<String>) -> Self {
        Self {
            num_votes: num_votes.into(),
            extra: Vec::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// Form-encoded pairs in submission order, `num_votes` first.
    pub fn to_pairs(&self, num_votes: u64) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.extra.len() + 1);
        pairs.push(("num_votes".to_string(), num_votes.to_string()));
        pairs.extend(
            self.extra
                .iter()
                .filter(|(k, _)| k != "num_votes")
                .cloned(),
        );
        pairs
    }
}

/// One status payload from `/check_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub is_running: bool,
    pub current_status: String,
    pub total_votes: u64,
    pub completed_votes: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub log_messages: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_batch: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_batches: Option<u64>,
}

/// Batch fields are informational: an ill-typed value drops the field instead
/// of the whole snapshot.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => match v.as_u64() {
            Some(n) => Some(n),
            None => {
                log::warn!("ignoring ill-typed batch field {v}");
                None
            }
        },
    })
}

/// Reply to `/start_voting` or `/stop_voting` once decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlReply {
    pub status: ReplyStatus,
    #[serde(default)]
    pub message: Option<String>,
}

impl ControlReply {
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.message.as_deref().unwrap_or(fallback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Stopping,
    Terminal,
}

impl SessionState {
    pub fn affordances(self) -> Affordances {
        match self {
            SessionState::Idle | SessionState::Terminal => Affordances {
                submit_enabled: true,
                stop_enabled: false,
            },
            SessionState::Running => Affordances {
                submit_enabled: false,
                stop_enabled: true,
            },
            SessionState::Starting | SessionState::Stopping => Affordances {
                submit_enabled: false,
                stop_enabled: false,
            },
        }
    }

    /// A job is in flight and owns the poll handle.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionState::Starting | SessionState::Running | SessionState::Stopping
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Stopping => "stopping",
            SessionState::Terminal => "finished",
        }
    }
}

/// Which controls the presentation layer should enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub submit_enabled: bool,
    pub stop_enabled: bool,
}

/// Display-ready progress metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressView {
    pub percent: f64,
    pub stats_text: String,
}

/// Everything the status panel shows for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub view: ProgressView,
    pub status_text: String,
    pub success_count: u64,
    pub error_count: u64,
}

impl ProgressUpdate {
    /// The reset panel shown while a start request is pending.
    pub fn starting() -> Self {
        Self {
            view: ProgressView {
                percent: 0.0,
                stats_text: "0/0 votes".into(),
            },
            status_text: "Starting...".into(),
            success_count: 0,
            error_count: 0,
        }
    }
}

/// Events emitted by the session and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    State(SessionState),
    Progress(ProgressUpdate),
    /// Status text changed without a new snapshot (e.g. "Stopping...").
    Status(String),
    LogCleared,
    LogAppended(Vec<String>),
    /// The job reached a terminal state; carries the last snapshot seen, if any.
    Finished(Option<Box<JobSnapshot>>),
}
