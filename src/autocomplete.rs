//! Debounced nutrition-database autocomplete with keyboard navigation.
//!
//! One [`Autocomplete`] is created per input widget. It owns the suggestion
//! list, the highlighted index and the pending debounce task.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, warn};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::NutritionixConfig;
use crate::nutritionix::{FoodSearch, FoodSuggestion};

/// Keys the suggestion list reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Other,
}

/// What a key press did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not handled; the host should process the key normally
    Ignored,
    /// Highlight moved to this index
    Highlighted(usize),
    /// A suggestion was committed; the query now holds this name
    Committed(String),
}

/// Timing and size limits for the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutocompleteOptions {
    pub debounce: Duration,
    pub min_query_len: usize,
}

impl Default for AutocompleteOptions {
    fn default() -> Self {
        AutocompleteOptions::from(&NutritionixConfig::default())
    }
}

impl From<&NutritionixConfig> for AutocompleteOptions {
    fn from(config: &NutritionixConfig) -> Self {
        AutocompleteOptions {
            debounce: config.debounce(),
            min_query_len: config.min_query_len,
        }
    }
}

/// Snapshot of what the widget shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionState {
    pub query: String,
    pub suggestions: Vec<FoodSuggestion>,
    pub highlighted: Option<usize>,
    pub visible: bool,
}

/// Autocomplete controller for one input field
pub struct Autocomplete<S: FoodSearch + 'static> {
    search: Arc<S>,
    options: AutocompleteOptions,
    state: Arc<Mutex<SuggestionState>>,
    pending: Option<JoinHandle<()>>,
}

impl<S: FoodSearch + 'static> Autocomplete<S> {
    pub fn new(search: Arc<S>, options: AutocompleteOptions) -> Self {
        Autocomplete {
            search,
            options,
            state: Arc::new(Mutex::new(SuggestionState::default())),
            pending: None,
        }
    }

    /// Current widget state
    pub fn state(&self) -> SuggestionState {
        lock(&self.state).clone()
    }

    /// Handle a keystroke that changed the input text. Must be called from
    /// within a tokio runtime.
    ///
    /// Cancels any pending search and schedules a new one after the quiet
    /// period. Aborting the pending task also drops a search it already has
    /// in flight, so only the newest query can update the list.
    pub fn on_input(&mut self, text: &str) {
        lock(&self.state).query = text.to_string();

        if let Some(pending) = self.pending.take() {
            pending.abort();
        }

        let query = text.trim().to_string();
        let search = Arc::clone(&self.search);
        let state = Arc::clone(&self.state);
        let options = self.options;

        self.pending = Some(tokio::spawn(async move {
            sleep(options.debounce).await;

            if query.chars().count() < options.min_query_len {
                hide(&state);
                return;
            }

            let suggestions = match search.search(&query).await {
                Ok(suggestions) => suggestions,
                Err(e) => {
                    warn!("Error fetching food suggestions: {}", e);
                    Vec::new()
                }
            };

            let mut state = lock(&state);
            state.visible = !suggestions.is_empty();
            state.suggestions = suggestions;
            state.highlighted = None;
        }));
    }

    /// Wait until the pending debounced search, if any, has finished
    pub async fn settle(&mut self) {
        if let Some(pending) = self.pending.take() {
            if let Err(e) = pending.await {
                if !e.is_cancelled() {
                    warn!("Suggestion task failed: {}", e);
                }
            }
        }
    }

    /// Keyboard navigation. Arrow keys wrap at both ends; Enter commits the
    /// highlighted suggestion. Keys are ignored while no suggestions are shown.
    pub fn on_key(&mut self, key: Key) -> KeyOutcome {
        let mut state = lock(&self.state);
        let count = state.suggestions.len();
        if count == 0 || !state.visible {
            return KeyOutcome::Ignored;
        }

        let next = match (key, state.highlighted) {
            (Key::ArrowDown, None) => 0,
            (Key::ArrowDown, Some(i)) => (i + 1) % count,
            (Key::ArrowUp, None) | (Key::ArrowUp, Some(0)) => count - 1,
            (Key::ArrowUp, Some(i)) => i - 1,
            (Key::Enter, Some(i)) => {
                drop(state);
                return self
                    .select(i)
                    .map_or(KeyOutcome::Ignored, KeyOutcome::Committed);
            }
            (Key::Enter, None) | (Key::Other, _) => return KeyOutcome::Ignored,
        };

        state.highlighted = Some(next);
        KeyOutcome::Highlighted(next)
    }

    /// Commit the suggestion at `index` (pointer click or Enter).
    ///
    /// Writes its display name into the query, hides the list and resets the
    /// highlight. Returns the committed name, which a session analyses
    /// through `AnalysisSession::on_commit`.
    pub fn select(&mut self, index: usize) -> Option<String> {
        let mut state = lock(&self.state);
        let name = state.suggestions.get(index)?.display_name().to_string();

        debug!("Selected suggestion {}: {}", index, name);
        state.query = name.clone();
        state.visible = false;
        state.highlighted = None;
        drop(state);

        // A search still pending for the old text must not reopen the list
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        Some(name)
    }

    /// Pointer event outside the input and the list: hide, keep the query
    pub fn dismiss(&mut self) {
        lock(&self.state).visible = false;
    }
}

impl<S: FoodSearch + 'static> Drop for Autocomplete<S> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

fn hide(state: &Mutex<SuggestionState>) {
    let mut state = lock(state);
    state.suggestions.clear();
    state.highlighted = None;
    state.visible = false;
}

fn lock(state: &Mutex<SuggestionState>) -> MutexGuard<'_, SuggestionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
