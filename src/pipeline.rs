//! Progress of a single document fetch:
//!
//! `NotStarted -> Navigating -> WaitingForSelector -> Extracting -> Assembled | Failed`
//!
//! Field-level failures during `Extracting` are recorded and degraded; they
//! never move the fetch to `Failed`.

use crate::error::{FieldError, ScrapeError};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    NotStarted,
    Navigating,
    WaitingForSelector,
    Extracting,
    Assembled,
    Failed,
}

impl FetchStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Assembled | Self::Failed)
    }

    pub fn can_advance_to(self, next: FetchStage) -> bool {
        use FetchStage::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (NotStarted, Navigating) => true,
            (Navigating, WaitingForSelector) | (Navigating, Extracting) => true,
            (WaitingForSelector, Extracting) => true,
            (Extracting, Assembled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Stage and degraded fields of one fetch.
#[derive(Debug)]
pub struct FetchTracker {
    url: String,
    stage: FetchStage,
    degraded: Vec<FieldError>,
}

impl FetchTracker {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stage: FetchStage::NotStarted,
            degraded: Vec::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn stage(&self) -> FetchStage {
        self.stage
    }

    /// Move to `next`. Returns `false` and stays put on an illegal transition.
    pub fn advance(&mut self, next: FetchStage) -> bool {
        if !self.stage.can_advance_to(next) {
            log::warn!("{}: illegal stage transition {} -> {}", self.url, self.stage, next);
            return false;
        }
        log::debug!("{}: {} -> {}", self.url, self.stage, next);
        self.stage = next;
        true
    }

    /// Mark the fetch failed and hand the error back for propagation.
    pub fn fail(&mut self, err: ScrapeError) -> ScrapeError {
        log::error!("{}: fetch failed during {}: {}", self.url, self.stage, err);
        self.advance(FetchStage::Failed);
        err
    }

    /// Unwrap a field result, recording a failure and substituting the placeholder.
    pub fn field<T: Default>(&mut self, result: Result<T, FieldError>) -> T {
        self.field_or(result, T::default())
    }

    pub fn field_or<T>(&mut self, result: Result<T, FieldError>, placeholder: T) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                log::warn!("{}: {}", self.url, e);
                self.degraded.push(e);
                placeholder
            }
        }
    }

    pub fn degraded(&self) -> &[FieldError] {
        &self.degraded
    }
}
