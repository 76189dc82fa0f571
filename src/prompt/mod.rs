//! Operator prompts for input the pipeline must not guess at.
//!
//! An ambiguous serial number or a conflict-resolution pass needs a human
//! decision before anything is submitted. Prompts are synchronous by
//! design: the extraction blocks until answered, so an invalid record can
//! never be silently submitted.

use dialoguer::{Confirm, Input};
use tracing::warn;

/// Synchronous operator interaction surface.
pub trait OperatorPrompt: Send + Sync {
    /// Asks a yes/no question; `false` on decline or unanswerable terminal.
    fn confirm(&self, message: &str) -> bool;

    /// Asks for a line of input with an editable initial value.
    /// `None` means the operator cancelled (or left it empty).
    fn input(&self, message: &str, initial: &str) -> Option<String>;
}

/// Interactive console prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

impl OperatorPrompt for ConsolePrompt {
    fn confirm(&self, message: &str) -> bool {
        Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .unwrap_or_else(|error| {
                warn!(%error, "confirm prompt unavailable; treating as declined");
                false
            })
    }

    fn input(&self, message: &str, initial: &str) -> Option<String> {
        let answer: String = Input::new()
            .with_prompt(message)
            .with_initial_text(initial)
            .allow_empty(true)
            .interact_text()
            .unwrap_or_else(|error| {
                warn!(%error, "input prompt unavailable; treating as cancelled");
                String::new()
            });

        let answer = answer.trim().to_string();
        if answer.is_empty() { None } else { Some(answer) }
    }
}

/// Preseeded answers for non-interactive runs (`--yes`, `--serial`) and
/// for tests.
#[derive(Debug, Default, Clone)]
pub struct StaticPrompt {
    confirm_all: bool,
    answer: Option<String>,
}

impl StaticPrompt {
    /// Confirms everything, answers every input prompt with `answer`.
    #[must_use]
    pub fn new(confirm_all: bool, answer: Option<String>) -> Self {
        Self {
            confirm_all,
            answer,
        }
    }

    /// Declines everything and cancels every input prompt.
    #[must_use]
    pub fn declining() -> Self {
        Self::default()
    }
}

impl OperatorPrompt for StaticPrompt {
    fn confirm(&self, _message: &str) -> bool {
        self.confirm_all
    }

    fn input(&self, _message: &str, _initial: &str) -> Option<String> {
        self.answer.clone()
    }
}
