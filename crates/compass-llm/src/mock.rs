//! Mock LLM provider for deterministic testing
//!
//! Returns pre-configured responses without making any network calls. Beyond
//! fixed responses it can script failures, add latency, and record how many
//! calls were in flight at once.

use crate::LlmError;
use async_trait::async_trait;
use compass_domain::traits::{GenerationRequest, LlmProvider};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// What the mock does for one call
#[derive(Debug, Clone, PartialEq)]
pub enum MockOutcome {
    /// Return this text
    Respond(String),
    /// Fail with a throttling error
    RateLimited,
    /// Fail with a generic transient error
    Unavailable,
    /// Fail with a timeout
    TimedOut,
    /// Fail with a non-retryable error
    Reject(String),
    /// Fail with rejected credentials
    Unauthorized,
}

impl MockOutcome {
    fn into_result(self) -> Result<String, LlmError> {
        match self {
            MockOutcome::Respond(text) => Ok(text),
            MockOutcome::RateLimited => Err(LlmError::RateLimitExceeded),
            MockOutcome::Unavailable => {
                Err(LlmError::Communication("Mock service unavailable".to_string()))
            }
            MockOutcome::TimedOut => Err(LlmError::Timeout(0)),
            MockOutcome::Reject(message) => Err(LlmError::Rejected {
                status: 400,
                message,
            }),
            MockOutcome::Unauthorized => {
                Err(LlmError::Authentication("Mock credentials rejected".to_string()))
            }
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    /// Consumed front to back before anything else
    queue: VecDeque<MockOutcome>,
    /// (prompt substring, outcome) pairs, checked in insertion order
    rules: Vec<(String, MockOutcome)>,
    /// Every request received
    requests: Vec<GenerationRequest>,
}

/// Scripted provider
///
/// # Examples
///
/// ```
/// use compass_llm::{MockOutcome, MockProvider};
///
/// let provider = MockProvider::new("{}")
///     .with_outcome_for("corrupt.txt", MockOutcome::Reject("bad".into()));
/// provider.push_outcome(MockOutcome::RateLimited);
/// assert_eq!(provider.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    latency: Duration,
    state: Arc<Mutex<MockState>>,
    call_count: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            latency: Duration::ZERO,
            state: Arc::new(Mutex::new(MockState::default())),
            call_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Use `outcome` whenever the prompt contains `needle`
    pub fn with_outcome_for(self, needle: impl Into<String>, outcome: MockOutcome) -> Self {
        self.lock().rules.push((needle.into(), outcome));
        self
    }

    /// Queue an outcome for the next call, ahead of rules and the default
    pub fn push_outcome(&self, outcome: MockOutcome) {
        self.lock().queue.push_back(outcome);
    }

    /// Number of times `generate_structured` was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.lock().requests.clone()
    }

    /// Reset the call counters
    pub fn reset_call_count(&self) {
        self.call_count.store(0, Ordering::SeqCst);
        self.max_in_flight.store(0, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_outcome(&self, request: &GenerationRequest) -> MockOutcome {
        let mut state = self.lock();
        state.requests.push(request.clone());

        if let Some(outcome) = state.queue.pop_front() {
            return outcome;
        }

        state
            .rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| MockOutcome::Respond(self.default_response.clone()))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("{}")
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    type Error = LlmError;

    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_structured(&self, request: &GenerationRequest) -> Result<String, Self::Error> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let outcome = self.next_outcome(request);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome.into_result()
    }
}
