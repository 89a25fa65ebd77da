//! Event-history preprocessing: slicing a flat, timestamped event log
//! into sessions and overlapping time windows, the shape the miner
//! consumes.

use crate::database::{Context, SequenceDatabase};
use crate::errors::{MinerError, Result};
use crate::item::Item;
use chrono::{DateTime, Datelike, Timelike, Utc};

/// Where the session marker sits relative to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPosition {
    /// The marker opens a session; events before the first marker are
    /// dropped.
    First,
    /// The marker closes a session; events after the last marker are
    /// dropped.
    Last,
}

/// A flat event log with per-event timestamps (integer minutes,
/// non-decreasing) and context tags.
#[derive(Debug, Clone)]
pub struct History<T> {
    events: Vec<T>,
    timestamps: Vec<i64>,
    contexts: Vec<Context>,
}

impl<T: Item> History<T> {
    pub fn new(events: Vec<T>, timestamps: Vec<i64>, contexts: Vec<Context>) -> Result<Self> {
        if events.len() != timestamps.len() || events.len() != contexts.len() {
            return Err(MinerError::InvalidInput(format!(
                "history shapes differ: {} events, {} timestamps, {} contexts",
                events.len(),
                timestamps.len(),
                contexts.len()
            )));
        }
        if timestamps.windows(2).any(|w| w[0] > w[1]) {
            return Err(MinerError::InvalidInput(
                "history timestamps are not non-decreasing".to_string(),
            ));
        }
        Ok(Self {
            events,
            timestamps,
            contexts,
        })
    }

    /// Build a history from wall-clock events: timestamps become
    /// minutes since the epoch, contexts the `(day-of-week, hour)`
    /// of each event.
    pub fn from_timestamped(events: Vec<(T, DateTime<Utc>)>) -> Result<Self> {
        let mut items = Vec::with_capacity(events.len());
        let mut timestamps = Vec::with_capacity(events.len());
        let mut contexts = Vec::with_capacity(events.len());
        for (item, at) in events {
            timestamps.push(at.timestamp() / 60);
            contexts.push(Context {
                day: at.weekday().num_days_from_monday(),
                hour: at.hour(),
            });
            items.push(item);
        }
        Self::new(items, timestamps, contexts)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[T] {
        &self.events
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    /// Cut the history into sessions at every occurrence of `marker`.
    pub fn split_by_event(&self, marker: &T, position: SplitPosition) -> Vec<History<T>> {
        let indices: Vec<usize> = self
            .events
            .iter()
            .enumerate()
            .filter(|(_, event)| *event == marker)
            .map(|(i, _)| i)
            .collect();

        let mut sessions = Vec::new();
        match position {
            SplitPosition::First => {
                for (k, &start) in indices.iter().enumerate() {
                    let end = indices.get(k + 1).copied().unwrap_or(self.events.len());
                    sessions.push(self.slice(start, end));
                }
            }
            SplitPosition::Last => {
                let mut start = 0;
                for &index in &indices {
                    sessions.push(self.slice(start, index + 1));
                    start = index + 1;
                }
            }
        }
        sessions
    }

    /// Cut the history into overlapping time windows. A window holds
    /// every event within `window_size` minutes of its head; the next
    /// head is the first event at least `slicing` minutes later.
    /// Windows with fewer than two events are dropped.
    #[allow(clippy::type_complexity)]
    pub fn windows(
        &self,
        window_size: i64,
        slicing: i64,
    ) -> (Vec<Vec<T>>, Vec<Vec<i64>>, Vec<Vec<Context>>) {
        let mut sequences = Vec::new();
        let mut timestamps = Vec::new();
        let mut contexts = Vec::new();

        let mut head = 0;
        while head + 1 < self.events.len() {
            let horizon = self.timestamps[head] + window_size;
            let end = self.timestamps.partition_point(|&t| t <= horizon);
            if end - head > 1 {
                sequences.push(self.events[head..end].to_vec());
                timestamps.push(self.timestamps[head..end].to_vec());
                contexts.push(self.contexts[head..end].to_vec());
            }
            let next = self
                .timestamps
                .partition_point(|&t| t < self.timestamps[head] + slicing);
            head = next.max(head + 1);
        }

        (sequences, timestamps, contexts)
    }

    /// Assemble the windows of many sessions into a sequence database.
    pub fn to_database(
        sessions: &[History<T>],
        window_size: i64,
        slicing: i64,
    ) -> Result<SequenceDatabase<T>> {
        let mut sequences = Vec::new();
        let mut timestamps = Vec::new();
        let mut contexts = Vec::new();
        for session in sessions {
            let (s, t, c) = session.windows(window_size, slicing);
            sequences.extend(s);
            timestamps.extend(t);
            contexts.extend(c);
        }
        SequenceDatabase::new(sequences)?
            .with_timestamps(timestamps)?
            .with_contexts(contexts)
    }

    /// The live tail: every event within `window_size` minutes of the
    /// most recent one.
    pub fn current_window(&self, window_size: i64) -> &[T] {
        let Some(&last) = self.timestamps.last() else {
            return &[];
        };
        let start = self.timestamps.partition_point(|&t| last - t > window_size);
        &self.events[start..]
    }

    fn slice(&self, start: usize, end: usize) -> History<T> {
        History {
            events: self.events[start..end].to_vec(),
            timestamps: self.timestamps[start..end].to_vec(),
            contexts: self.contexts[start..end].to_vec(),
        }
    }
}
