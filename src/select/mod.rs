//! Numbered-choice selection.
//!
//! Resolution is pure: [`resolve_single`] and [`resolve_multi`] map operator
//! input onto a candidate count. [`Selector`] ties resolution to a
//! [`Prompter`] and hands back references into the exact slice it displayed,
//! so a candidate list cannot change between display and resolution.

pub mod prompt;

pub use prompt::{Prompter, ScriptedPrompter, TerminalPrompter};

use crate::error::{PullError, Result};
use std::collections::BTreeSet;
use std::fmt::Display;

/// Why a selection resolved to nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Operator left the answer blank
    Blank,
    /// Input stream closed before an answer
    InputClosed,
    /// Single-choice answer was not a listed number
    Invalid(String),
    /// Every multi-choice token was dropped
    NoValidEntries,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => f.write_str("no selection"),
            Self::InputClosed => f.write_str("input closed"),
            Self::Invalid(input) => write!(f, "invalid choice '{input}'"),
            Self::NoValidEntries => f.write_str("no valid entries selected"),
        }
    }
}

/// A token dropped from a multi-choice answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejected {
    NotNumeric(String),
    OutOfRange(String),
}

impl Display for Rejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotNumeric(token) => write!(f, "'{token}' is not a number"),
            Self::OutOfRange(token) => write!(f, "{token} is not in the list"),
        }
    }
}

/// Outcome of resolving an answer against a snapshot of `len` candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// 1-based indices, ascending and unique; never empty
    Chosen(Vec<usize>),
    Skipped(SkipReason),
}

impl Selection {
    /// Candidates from `snapshot` named by this selection
    #[must_use]
    pub fn pick<'a, T>(&self, snapshot: &'a [T]) -> Vec<&'a T> {
        match self {
            Self::Chosen(indices) => indices
                .iter()
                .filter_map(|&i| i.checked_sub(1).and_then(|i| snapshot.get(i)))
                .collect(),
            Self::Skipped(_) => Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Multi-choice selection plus the tokens that were dropped on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub selection: Selection,
    pub rejected: Vec<Rejected>,
}

/// Resolve a single 1-based index; anything else is a skip
#[must_use]
pub fn resolve_single(input: &str, len: usize) -> Selection {
    let input = input.trim();
    if input.is_empty() {
        return Selection::Skipped(SkipReason::Blank);
    }
    match parse_index(input, len) {
        Ok(index) => Selection::Chosen(vec![index]),
        Err(_) => Selection::Skipped(SkipReason::Invalid(input.to_string())),
    }
}

/// Resolve a comma-separated list of 1-based indices.
///
/// Bad tokens are dropped individually, duplicates collapse, and an answer
/// with nothing valid left is a skip.
#[must_use]
pub fn resolve_multi(input: &str, len: usize) -> Resolution {
    if input.trim().is_empty() {
        return Resolution {
            selection: Selection::Skipped(SkipReason::Blank),
            rejected: Vec::new(),
        };
    }

    let mut chosen = BTreeSet::new();
    let mut rejected = Vec::new();
    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match parse_index(token, len) {
            Ok(index) => {
                chosen.insert(index);
            }
            Err(reject) => rejected.push(reject),
        }
    }

    let selection = if chosen.is_empty() {
        Selection::Skipped(SkipReason::NoValidEntries)
    } else {
        Selection::Chosen(chosen.into_iter().collect())
    };
    Resolution {
        selection,
        rejected,
    }
}

fn parse_index(token: &str, len: usize) -> std::result::Result<usize, Rejected> {
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return Err(Rejected::NotNumeric(token.to_string()));
    }
    match token.parse::<usize>() {
        Ok(index) if (1..=len).contains(&index) => Ok(index),
        _ => Err(Rejected::OutOfRange(token.to_string())),
    }
}

/// Interactive selection over a [`Prompter`]
#[derive(Debug)]
pub struct Selector<P> {
    prompter: P,
}

impl<P: Prompter> Selector<P> {
    pub const fn new(prompter: P) -> Self {
        Self { prompter }
    }

    pub const fn prompter(&self) -> &P {
        &self.prompter
    }

    pub fn into_prompter(self) -> P {
        self.prompter
    }

    /// Pass a status line through to the operator
    pub fn notify(&mut self, message: &str) -> Result<()> {
        self.prompter.notify(message)
    }

    /// One candidate or a skip (blank, invalid, or closed input)
    pub fn choose_one<'a, T: Display>(
        &mut self,
        title: &str,
        question: &str,
        snapshot: &'a [T],
    ) -> Result<(Option<&'a T>, Selection)> {
        self.present(title, snapshot)?;
        let selection = match self.prompter.read_answer(question)? {
            Some(answer) => resolve_single(&answer, snapshot.len()),
            None => Selection::Skipped(SkipReason::InputClosed),
        };
        if let Selection::Skipped(SkipReason::Invalid(input)) = &selection {
            tracing::warn!("Invalid choice '{input}', expected 1-{}", snapshot.len());
        }
        Ok((selection.pick(snapshot).into_iter().next(), selection))
    }

    /// Zero or more candidates from a comma-separated answer
    pub fn choose_many<'a, T: Display>(
        &mut self,
        title: &str,
        question: &str,
        snapshot: &'a [T],
    ) -> Result<(Vec<&'a T>, Selection)> {
        self.present(title, snapshot)?;
        let resolution = match self.prompter.read_answer(question)? {
            Some(answer) => resolve_multi(&answer, snapshot.len()),
            None => Resolution {
                selection: Selection::Skipped(SkipReason::InputClosed),
                rejected: Vec::new(),
            },
        };
        for reject in &resolution.rejected {
            tracing::warn!("Ignoring invalid entry: {reject}");
            self.prompter
                .notify(&format!("Ignoring invalid entry: {reject}"))?;
        }
        Ok((resolution.selection.pick(snapshot), resolution.selection))
    }

    /// Ask until a valid single index is given; closed input aborts
    pub fn choose_required<'a, T: Display>(
        &mut self,
        title: &str,
        question: &str,
        snapshot: &'a [T],
    ) -> Result<&'a T> {
        if snapshot.is_empty() {
            return Err(PullError::Aborted(format!("nothing to choose for '{title}'")));
        }
        self.present(title, snapshot)?;
        loop {
            let Some(answer) = self.prompter.read_answer(question)? else {
                return Err(PullError::Aborted(format!(
                    "input closed while waiting for '{question}'"
                )));
            };
            if let Some(choice) = resolve_single(&answer, snapshot.len())
                .pick(snapshot)
                .into_iter()
                .next()
            {
                return Ok(choice);
            }
            self.prompter.notify("Invalid choice. Try again.")?;
        }
    }

    fn present<T: Display>(&mut self, title: &str, snapshot: &[T]) -> Result<()> {
        let labels: Vec<String> = snapshot.iter().map(ToString::to_string).collect();
        self.prompter.present_choices(title, &labels)
    }
}
