//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use crate::conversation::Message;
use crate::db::{TranscriptError, TranscriptRole, TranscriptSink};
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use crate::strava::{Activity, Athlete, AthleteStats, StravaApi, StravaError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of tool results present in each recorded request
    pub fn tool_results_seen(&self) -> Vec<usize> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| {
                r.messages
                    .iter()
                    .filter(|m| matches!(m, Message::ToolResult(_)))
                    .count()
            })
            .collect()
    }
}

#[async_trait]
impl LlmService for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Mock Strava API
// ============================================================================

/// Counts calls and the peak number running at once
#[derive(Debug, Default)]
pub struct CallTracker {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CallTracker {
    fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// In-memory Strava account
#[derive(Default)]
pub struct MockStravaApi {
    stats: AthleteStats,
    activities: Vec<Activity>,
    fail_auth: bool,
    delay: Option<Duration>,
    tracker: Arc<CallTracker>,
}

impl MockStravaApi {
    pub fn with_stats(mut self, stats: AthleteStats) -> Self {
        self.stats = stats;
        self
    }

    /// Activities returned by listings (regardless of range) and lookups
    pub fn with_activities(mut self, activities: Vec<Activity>) -> Self {
        self.activities = activities;
        self
    }

    /// Every call fails as if the token had expired
    pub fn failing_auth(mut self) -> Self {
        self.fail_auth = true;
        self
    }

    /// Hold each call open for `delay` so overlapping calls can be observed
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn tracker(&self) -> Arc<CallTracker> {
        Arc::clone(&self.tracker)
    }

    async fn call<T>(&self, f: impl FnOnce() -> Result<T, StravaError>) -> Result<T, StravaError> {
        self.tracker.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = if self.fail_auth {
            Err(StravaError::Auth("401 Unauthorized".to_string()))
        } else {
            f()
        };
        self.tracker.exit();
        result
    }
}

#[async_trait]
impl StravaApi for MockStravaApi {
    async fn athlete(&self) -> Result<Athlete, StravaError> {
        self.call(|| Ok(Athlete { id: 42 })).await
    }

    async fn athlete_stats(&self, _athlete_id: u64) -> Result<AthleteStats, StravaError> {
        self.call(|| Ok(self.stats.clone())).await
    }

    async fn activities_between(&self, _after: i64, _before: i64) -> Result<Vec<Activity>, StravaError> {
        self.call(|| Ok(self.activities.clone())).await
    }

    async fn activity(&self, id: u64) -> Result<Activity, StravaError> {
        self.call(|| {
            self.activities
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or_else(|| StravaError::NotFound(format!("/activities/{id}")))
        })
        .await
    }
}

/// Summary activity with the fields listings use
pub fn activity(id: u64, name: &str, kind: Option<&str>, distance_m: f64) -> Activity {
    Activity {
        id,
        name: name.to_string(),
        activity_type: kind.map(String::from),
        distance: Some(distance_m),
        start_date_local: "2023-01-01T08:00:00Z".to_string(),
        ..Activity::default()
    }
}

// ============================================================================
// Transcript sinks
// ============================================================================

/// Records transcript rows in memory
#[derive(Default)]
pub struct MemoryTranscript {
    pub rows: Mutex<Vec<(String, TranscriptRole, String)>>,
}

impl MemoryTranscript {
    pub fn rows(&self) -> Vec<(String, TranscriptRole, String)> {
        self.rows.lock().unwrap().clone()
    }
}

impl TranscriptSink for MemoryTranscript {
    fn record(&self, session_id: &str, role: TranscriptRole, content: &str) -> Result<(), TranscriptError> {
        self.rows
            .lock()
            .unwrap()
            .push((session_id.to_string(), role, content.to_string()));
        Ok(())
    }
}

/// Sink whose storage is always unavailable
pub struct BrokenTranscript;

impl TranscriptSink for BrokenTranscript {
    fn record(&self, _session_id: &str, _role: TranscriptRole, _content: &str) -> Result<(), TranscriptError> {
        Err(TranscriptError::Unavailable)
    }
}
