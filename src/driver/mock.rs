//! Scripted in-memory client for unit tests.

use std::sync::{Arc, Mutex};

use super::Client;
use crate::error::{Error, Result};

#[derive(Default)]
struct State {
    responses: Vec<(String, Vec<String>)>,
    failures: Vec<String>,
    executed: Vec<String>,
    queried: Vec<String>,
    closes: usize,
}

/// Answers queries by substring match against registered responses and
/// records every statement it executes.
pub(crate) struct MockClient {
    state: Arc<Mutex<State>>,
}

/// Test-side view of a [`MockClient`] after it was moved into a connection.
#[derive(Clone)]
pub(crate) struct MockHandle {
    state: Arc<Mutex<State>>,
}

impl MockClient {
    pub(crate) fn new() -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(State::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockHandle { state },
        )
    }
}

impl MockHandle {
    /// Rows returned by the first query containing `needle`.
    pub(crate) fn respond(&self, needle: &str, rows: &[&str]) -> &Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .push((needle.to_string(), rows.iter().map(|r| r.to_string()).collect()));
        self
    }

    /// Fail any statement containing `needle`.
    pub(crate) fn fail_on(&self, needle: &str) -> &Self {
        self.state.lock().unwrap().failures.push(needle.to_string());
        self
    }

    pub(crate) fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    pub(crate) fn queried(&self) -> Vec<String> {
        self.state.lock().unwrap().queried.clone()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

impl Client for MockClient {
    fn execute(&mut self, sql: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failures.iter().any(|f| sql.contains(f.as_str())) {
            return Err(Error::query(sql, "mock failure"));
        }
        state.executed.push(sql.to_string());
        Ok(())
    }

    fn query_column(&mut self, sql: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.queried.push(sql.to_string());
        if state.failures.iter().any(|f| sql.contains(f.as_str())) {
            return Err(Error::query(sql, "mock failure"));
        }
        Ok(state
            .responses
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}
