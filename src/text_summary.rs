//! Text summary builder for CLI output.
//!
//! Formats the final snapshot of a job into human-readable lines for text mode.

use vote_console::model::JobSnapshot;
use vote_console::progress;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary from the last snapshot a job produced.
pub(crate) fn build_text_summary(last: &JobSnapshot) -> TextSummary {
    let view = progress::project(last);
    let mut lines = Vec::new();

    lines.push(format!("Status:    {}", last.current_status));
    lines.push(format!("Progress:  {} ({:.1}%)", view.stats_text, view.percent));
    lines.push(format!("Succeeded: {}", last.success_count));
    lines.push(format!("Failed:    {}", last.error_count));

    let attempted = last.success_count + last.error_count;
    if attempted > 0 {
        let rate = last.success_count as f64 / attempted as f64 * 100.0;
        lines.push(format!("Success rate: {:.1}%", rate));
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_reports_counts_and_rate() {
        let last = JobSnapshot {
            is_running: false,
            current_status: "Voting process completed".into(),
            total_votes: 4,
            completed_votes: 4,
            success_count: 3,
            error_count: 1,
            log_messages: Vec::new(),
            current_batch: None,
            total_batches: None,
        };
        let s = build_text_summary(&last);
        assert_eq!(s.lines[0], "Status:    Voting process completed");
        assert_eq!(s.lines[1], "Progress:  4/4 votes (100.0%)");
        assert_eq!(s.lines.last().unwrap(), "Success rate: 75.0%");
    }

    #[test]
    fn no_rate_without_attempts() {
        let last = JobSnapshot {
            is_running: false,
            current_status: "Stopped by user".into(),
            total_votes: 10,
            completed_votes: 0,
            success_count: 0,
            error_count: 0,
            log_messages: Vec::new(),
            current_batch: None,
            total_batches: None,
        };
        assert_eq!(build_text_summary(&last).lines.len(), 4);
    }
}
