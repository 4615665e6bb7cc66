//! Bounded log view and the reconciler that feeds it from cumulative server logs.

use crate::model::{DedupStrategy, DEFAULT_MAX_LOG_LINES};
use std::collections::{HashSet, VecDeque};

/// Append-only view of log lines, bounded to `capacity` (oldest evicted first).
#[derive(Debug, Clone)]
pub struct LogView {
    lines: VecDeque<String>,
    capacity: usize,
    strategy: DedupStrategy,
    // Every server message absorbed during the current job, including evicted ones.
    absorbed: HashSet<String>,
    // Server messages consumed so far, for the length strategy.
    consumed: usize,
}

impl Default for LogView {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOG_LINES, DedupStrategy::Content)
    }
}

impl LogView {
    pub fn new(capacity: usize, strategy: DedupStrategy) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            strategy,
            absorbed: HashSet::new(),
            consumed: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn strategy(&self) -> DedupStrategy {
        self.strategy
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &String> + ExactSizeIterator {
        self.lines.iter()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    /// Drop every line and forget what was absorbed. Called once per new job.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.absorbed.clear();
        self.consumed = 0;
    }

    /// Append a locally generated line; no dedup applies.
    pub fn push_local(&mut self, line: impl Into<String>) {
        self.push(line.into());
    }

    /// Append lines that were already deduplicated elsewhere (UI mirrors).
    pub fn extend_local<I: IntoIterator<Item = String>>(&mut self, lines: I) {
        for line in lines {
            self.push(line);
        }
    }

    fn push(&mut self, line: String) {
        self.lines.push_back(line);
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }
}

/// Merge a cumulative server log into `view`, returning the lines appended.
///
/// Server order is preserved. What counts as "already present" depends on the
/// view's [`DedupStrategy`].
pub fn reconcile(view: &mut LogView, incoming: &[String]) -> Vec<String> {
    let fresh: Vec<String> = match view.strategy {
        DedupStrategy::Content => {
            let mut fresh = Vec::new();
            for msg in incoming {
                if view.absorbed.insert(msg.clone()) {
                    fresh.push(msg.clone());
                }
            }
            fresh
        }
        DedupStrategy::Length => {
            if incoming.len() < view.consumed {
                // Server log shrank: it was reset, take it from the top.
                log::debug!(
                    "server log shrank from {} to {} entries, resyncing",
                    view.consumed,
                    incoming.len()
                );
                view.consumed = 0;
            }
            let fresh = incoming[view.consumed..].to_vec();
            view.consumed = incoming.len();
            fresh
        }
    };

    for line in &fresh {
        view.push(line.clone());
    }
    fresh
}
