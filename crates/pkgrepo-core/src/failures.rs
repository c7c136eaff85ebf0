//! Aggregate-and-continue error collection.
//!
//! Independent per-item work (one directory per architecture, one file per
//! package) must all be attempted even when some items fail, so the caller
//! sees every broken item in one pass. Sequential pipeline steps do not use
//! this; they propagate the first failure with `?`.

use crate::error::RepoError;

/// Collects failures from independent operations, in the order they happen.
#[derive(Debug, Default)]
pub struct Failures {
    errors: Vec<RepoError>,
}

impl Failures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure. Nested aggregates are flattened.
    pub fn push(&mut self, err: RepoError) {
        match err {
            RepoError::Aggregate(errors) => self.errors.extend(errors),
            err => self.errors.push(err),
        }
    }

    /// Record the error of `result`, if any, and hand back the success value.
    pub fn add<T>(&mut self, result: Result<T, RepoError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.push(err);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Collapse into a single result.
    ///
    /// A lone failure is returned as-is so callers can still match on it;
    /// two or more become [`RepoError::Aggregate`].
    ///
    /// # Errors
    ///
    /// Returns the collected failure(s), if any were recorded.
    pub fn resolve(mut self) -> Result<(), RepoError> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(RepoError::Aggregate(self.errors)),
        }
    }
}
