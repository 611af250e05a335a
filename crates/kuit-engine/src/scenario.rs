//! Scenario orchestration.
//!
//! A scenario walks `Start → FormOpened → FormFilled → Submitted →
//! Reconciled → Asserted → CleanedUp`. Any step may fail and end the walk
//! early, but cleanup runs every time.

use crate::page::Diagnostics;
use crate::payload::PayloadError;
use async_trait::async_trait;
use kuit_common::error::{ApiError, SessionError};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Start,
    FormOpened,
    FormFilled,
    Submitted,
    Reconciled { found: bool },
    Asserted,
    CleanedUp,
}

impl ScenarioState {
    fn rank(self) -> u8 {
        match self {
            Self::Start => 0,
            Self::FormOpened => 1,
            Self::FormFilled => 2,
            Self::Submitted => 3,
            Self::Reconciled { .. } => 4,
            Self::Asserted => 5,
            Self::CleanedUp => 6,
        }
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::FormOpened => write!(f, "FormOpened"),
            Self::FormFilled => write!(f, "FormFilled"),
            Self::Submitted => write!(f, "Submitted"),
            Self::Reconciled { found: true } => write!(f, "Reconciled(Found)"),
            Self::Reconciled { found: false } => write!(f, "Reconciled(NotFound)"),
            Self::Asserted => write!(f, "Asserted"),
            Self::CleanedUp => write!(f, "CleanedUp"),
        }
    }
}

/// Result of confirming a UI action through the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Key of the matching remote resource.
    Found(String),
    NotFound,
}

impl Reconciliation {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Found(key) => Some(key),
            Self::NotFound => None,
        }
    }
}

impl From<Option<String>> for Reconciliation {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::NotFound, Self::Found)
    }
}

/// What a scenario expects reconciliation to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Positive scenario: the resource must show up.
    Present,
    /// Negative scenario: nothing may show up within the same deadline.
    Absent,
}

impl Expectation {
    pub fn check(self, outcome: &Reconciliation) -> Result<(), ScenarioError> {
        match (self, outcome) {
            (Self::Present, Reconciliation::Found(_)) | (Self::Absent, Reconciliation::NotFound) => {
                Ok(())
            }
            (Self::Present, Reconciliation::NotFound) => Err(ScenarioError::Assertion(
                "expected resource was not found through the API".to_string(),
            )),
            (Self::Absent, Reconciliation::Found(key)) => Err(ScenarioError::Assertion(format!(
                "unexpected resource '{}' found through the API",
                key
            ))),
        }
    }
}

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Navigation failed: {diagnostics}")]
    Navigation { diagnostics: Diagnostics },

    #[error("Step failed: {0}")]
    Step(#[from] SessionError),

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("Invalid transition from {from} to {to}")]
    Transition {
        from: ScenarioState,
        to: ScenarioState,
    },
}

impl ScenarioError {
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }
}

/// Forward-only record of the states a scenario passed through.
#[derive(Debug, Clone)]
pub struct ScenarioRecorder {
    history: Vec<ScenarioState>,
}

impl ScenarioRecorder {
    pub fn new() -> Self {
        Self {
            history: vec![ScenarioState::Start],
        }
    }

    pub fn current(&self) -> ScenarioState {
        self.history
            .last()
            .copied()
            .unwrap_or(ScenarioState::Start)
    }

    pub fn advance(&mut self, next: ScenarioState) -> Result<(), ScenarioError> {
        let from = self.current();
        if next.rank() <= from.rank() {
            return Err(ScenarioError::Transition { from, to: next });
        }
        debug!("{} -> {}", from, next);
        self.history.push(next);
        Ok(())
    }

    pub fn history(&self) -> &[ScenarioState] {
        &self.history
    }

    pub fn into_history(self) -> Vec<ScenarioState> {
        self.history
    }
}

impl Default for ScenarioRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// The steps of one scenario. Only `open` and `reconcile` are mandatory;
/// API-only scenarios leave `fill` and `submit` as no-ops.
#[async_trait]
pub trait Steps: Send {
    fn expectation(&self) -> Expectation;

    async fn open(&mut self) -> Result<(), ScenarioError>;

    async fn fill(&mut self) -> Result<(), ScenarioError> {
        Ok(())
    }

    async fn submit(&mut self) -> Result<(), ScenarioError> {
        Ok(())
    }

    async fn reconcile(&mut self) -> Result<Reconciliation, ScenarioError>;

    /// Assert on the reconciliation outcome. Scenarios with UI-side checks
    /// extend this.
    async fn verify(&mut self, outcome: &Reconciliation) -> Result<(), ScenarioError> {
        self.expectation().check(outcome)
    }

    /// Best-effort removal of what the scenario created. Returns how many
    /// remote resources were deleted.
    async fn cleanup(&mut self) -> usize {
        0
    }
}

#[derive(Debug)]
pub struct ScenarioReport {
    pub name: String,
    pub outcome: Result<(), ScenarioError>,
    pub history: Vec<ScenarioState>,
    pub reconciliation: Option<Reconciliation>,
    pub cleaned: usize,
    pub elapsed: Duration,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Last state reached before cleanup.
    pub fn reached(&self) -> ScenarioState {
        self.history
            .iter()
            .rev()
            .copied()
            .find(|state| *state != ScenarioState::CleanedUp)
            .unwrap_or(ScenarioState::Start)
    }
}

async fn drive<S: Steps + ?Sized>(
    steps: &mut S,
    recorder: &mut ScenarioRecorder,
    reconciliation: &mut Option<Reconciliation>,
) -> Result<(), ScenarioError> {
    steps.open().await?;
    recorder.advance(ScenarioState::FormOpened)?;

    steps.fill().await?;
    recorder.advance(ScenarioState::FormFilled)?;

    steps.submit().await?;
    recorder.advance(ScenarioState::Submitted)?;

    let outcome = steps.reconcile().await?;
    recorder.advance(ScenarioState::Reconciled {
        found: outcome.is_found(),
    })?;
    let verified = steps.verify(&outcome).await;
    *reconciliation = Some(outcome);
    verified?;
    recorder.advance(ScenarioState::Asserted)
}

/// Run `steps` to completion. Cleanup runs whatever state the scenario
/// stopped in.
pub async fn run_scenario<S: Steps + ?Sized>(name: &str, steps: &mut S) -> ScenarioReport {
    info!("Scenario {} started", name);
    let started = Instant::now();
    let mut recorder = ScenarioRecorder::new();
    let mut reconciliation = None;

    let outcome = drive(steps, &mut recorder, &mut reconciliation).await;
    if let Err(e) = &outcome {
        error!("Scenario {} failed after {}: {}", name, recorder.current(), e);
    }

    let cleaned = steps.cleanup().await;
    if cleaned > 0 {
        info!("Scenario {} cleaned up {} resource(s)", name, cleaned);
    }
    // CleanedUp ranks above every other state.
    let _ = recorder.advance(ScenarioState::CleanedUp);

    let elapsed = started.elapsed();
    info!(
        "Scenario {} {} in {:?}",
        name,
        if outcome.is_ok() { "passed" } else { "failed" },
        elapsed
    );
    ScenarioReport {
        name: name.to_string(),
        outcome,
        history: recorder.into_history(),
        reconciliation,
        cleaned,
        elapsed,
    }
}
