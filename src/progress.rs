//! Progress projection.
//!
//! Turns a raw snapshot into the numbers and text the status panel shows. Pure
//! functions only; callers may project the same snapshot any number of times.

use crate::model::{JobSnapshot, ProgressUpdate, ProgressView};

/// Project a snapshot into a percentage and a stats line.
pub fn project(snapshot: &JobSnapshot) -> ProgressView {
    ProgressView {
        percent: percent(snapshot.completed_votes, snapshot.total_votes),
        stats_text: stats_text(snapshot),
    }
}

/// Project a snapshot together with its status text and counters.
pub fn project_update(snapshot: &JobSnapshot) -> ProgressUpdate {
    ProgressUpdate {
        view: project(snapshot),
        status_text: snapshot.current_status.clone(),
        success_count: snapshot.success_count,
        error_count: snapshot.error_count,
    }
}

fn percent(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = (completed as f64 / total as f64) * 100.0;
    // A server that over-reports completed votes still renders a full bar.
    p.clamp(0.0, 100.0)
}

fn stats_text(snapshot: &JobSnapshot) -> String {
    let mut text = format!(
        "{}/{} votes",
        snapshot.completed_votes, snapshot.total_votes
    );
    if let (Some(current), Some(total)) = (snapshot.current_batch, snapshot.total_batches) {
        if current >= 1 && total >= 1 && current <= total {
            text.push_str(&format!(" (Batch {current}/{total})"));
        }
    }
    text
}
