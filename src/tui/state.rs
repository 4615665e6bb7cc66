use vote_console::logview::LogView;
use vote_console::model::{
    Affordances, DedupStrategy, ProgressUpdate, SessionEvent, SessionState,
};

const MAX_INPUT_DIGITS: usize = 9;

/// Everything the dashboard draws. Owned by the UI thread only.
pub struct UiState {
    pub votes_input: String,
    pub session: SessionState,
    pub progress: ProgressUpdate,
    // The status card stays hidden until the first job is submitted.
    pub show_status: bool,
    pub show_help: bool,
    pub info: String,
    pub base_url: String,
    pub log: LogView,
}

impl UiState {
    pub fn new(base_url: String, votes: Option<String>, max_log_lines: usize) -> Self {
        let votes_input = votes
            .map(|v| v.chars().filter(char::is_ascii_digit).take(MAX_INPUT_DIGITS).collect())
            .unwrap_or_default();
        Self {
            votes_input,
            session: SessionState::Idle,
            progress: ProgressUpdate::starting(),
            show_status: false,
            show_help: false,
            info: "Enter a vote count and press Enter".into(),
            base_url,
            // Lines arrive already deduplicated; the mirror only enforces the bound.
            log: LogView::new(max_log_lines, DedupStrategy::Content),
        }
    }

    pub fn affordances(&self) -> Affordances {
        self.session.affordances()
    }

    pub fn push_input(&mut self, c: char) {
        if self.affordances().submit_enabled
            && c.is_ascii_digit()
            && self.votes_input.len() < MAX_INPUT_DIGITS
        {
            self.votes_input.push(c);
        }
    }

    pub fn pop_input(&mut self) {
        if self.affordances().submit_enabled {
            self.votes_input.pop();
        }
    }

    pub fn apply_event(&mut self, ev: SessionEvent) {
        match ev {
            SessionEvent::State(s) => {
                self.session = s;
                self.info = match s {
                    SessionState::Idle | SessionState::Terminal => {
                        "Enter a vote count and press Enter".into()
                    }
                    SessionState::Starting => "Starting...".into(),
                    SessionState::Running => "Running. Press s to stop".into(),
                    SessionState::Stopping => "Stopping...".into(),
                };
            }
            SessionEvent::Progress(u) => {
                self.show_status = true;
                self.progress = u;
            }
            SessionEvent::Status(text) => self.progress.status_text = text,
            SessionEvent::LogCleared => self.log.clear(),
            SessionEvent::LogAppended(lines) => self.log.extend_local(lines),
            SessionEvent::Finished(_) => {
                self.info = "Job finished. Enter to start another".into();
            }
        }
    }
}
