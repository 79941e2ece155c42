//! View state for one analysis screen.
//!
//! Requests may overlap. Each one takes a generation ticket when it starts and
//! its outcome is applied only if no newer request (or `clear`) has happened
//! since, so the view always reflects the most recent submission.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use crate::autocomplete::KeyOutcome;
use crate::builder::Analyzer;
use crate::images::ImageSource;
use crate::language::DEFAULT_LANGUAGE_CODE;
use crate::model::NutritionResult;
use crate::AnalysisError;

/// What the result area currently shows
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewState {
    #[default]
    Idle,
    Loading,
    Ready(NutritionResult),
    /// User-facing error message
    Failed(String),
}

pub struct AnalysisSession {
    analyzer: Analyzer,
    language: Mutex<String>,
    state: Mutex<ViewState>,
    generation: AtomicU64,
}

impl AnalysisSession {
    pub fn new(analyzer: Analyzer) -> Self {
        AnalysisSession {
            analyzer,
            language: Mutex::new(DEFAULT_LANGUAGE_CODE.to_string()),
            state: Mutex::new(ViewState::Idle),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_language(self, code: impl Into<String>) -> Self {
        *lock(&self.language) = code.into();
        self
    }

    pub fn set_language(&self, code: impl Into<String>) {
        *lock(&self.language) = code.into();
    }

    pub fn language(&self) -> String {
        lock(&self.language).clone()
    }

    pub fn state(&self) -> ViewState {
        lock(&self.state).clone()
    }

    /// Reset the view. Results of requests still in flight are discarded.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *lock(&self.state) = ViewState::Idle;
    }

    /// Analyse a food image and show the outcome
    pub async fn analyze_image(&self, image: &ImageSource) -> Result<NutritionResult, AnalysisError> {
        let ticket = self.begin();
        let language = self.language();
        let outcome = self.analyzer.analyze_image(image, &language).await;
        self.finish(ticket, &outcome);
        outcome
    }

    /// Analyse a food description and show the outcome
    pub async fn analyze_text(&self, description: &str) -> Result<NutritionResult, AnalysisError> {
        let ticket = self.begin();
        let language = self.language();
        let outcome = self.analyzer.analyze_text(description, &language).await;
        self.finish(ticket, &outcome);
        outcome
    }

    /// Analyse a suggestion committed from the autocomplete list.
    ///
    /// Returns `None` when the key press did not commit anything.
    pub async fn on_autocomplete(
        &self,
        outcome: KeyOutcome,
    ) -> Option<Result<NutritionResult, AnalysisError>> {
        match outcome {
            KeyOutcome::Committed(name) => Some(self.on_commit(&name).await),
            _ => None,
        }
    }

    /// Analyse a suggestion picked by pointer, as returned by
    /// [`Autocomplete::select`](crate::autocomplete::Autocomplete::select).
    pub async fn on_commit(&self, name: &str) -> Result<NutritionResult, AnalysisError> {
        debug!("Autocomplete committed {:?}", name);
        self.analyze_text(name).await
    }

    fn begin(&self) -> u64 {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.state) = ViewState::Loading;
        ticket
    }

    fn finish(&self, ticket: u64, outcome: &Result<NutritionResult, AnalysisError>) {
        let mut state = lock(&self.state);
        // Checked under the state lock so a concurrent begin() or clear() cannot interleave
        if self.generation.load(Ordering::SeqCst) != ticket {
            debug!("Discarding stale result for request {}", ticket);
            return;
        }

        *state = match outcome {
            Ok(result) => ViewState::Ready(result.clone()),
            Err(e) => {
                warn!("Analysis failed: {}", e);
                ViewState::Failed(e.to_string())
            }
        };
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
