//! Ranked call-shape resolution.
//!
//! A `SignatureResolver` holds the candidate forms of one logical operation,
//! ordered from most to least commonly supported. `resolve` runs them in order
//! and stops at the first that completes. There is no memoization: each
//! operation builds a fresh resolver, so two objects of different kinds in the
//! same run may settle on different shapes.

use core::fmt;

use tracing::{debug, trace};

use crate::error::{DispatchError, DispatchResult};

type Attempt<'a, T> = Box<dyn FnOnce() -> DispatchResult<T> + 'a>;

/// Candidate call forms for one operation.
pub struct SignatureResolver<'a, T> {
    operation: &'static str,
    candidates: Vec<(&'static str, Attempt<'a, T>)>,
    halt_on_engine_failure: bool,
}

/// The shape that succeeded and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub shape: &'static str,
    pub value: T,
    /// Number of shapes tried and rejected before this one.
    pub rejected: usize,
}

/// Every candidate failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Unresolved {
    pub operation: &'static str,
    pub attempts: Vec<(&'static str, DispatchError)>,
}

impl Unresolved {
    /// First failure the host itself raised, skipping shape rejections.
    pub fn engine_failure(&self) -> Option<&DispatchError> {
        self.attempts
            .iter()
            .map(|(_, e)| e)
            .find(|e| e.is_engine_failure())
    }

    /// Message of the most informative failure.
    pub fn message(&self) -> String {
        match self.engine_failure().or_else(|| self.attempts.last().map(|(_, e)| e)) {
            Some(e) => e.to_string(),
            None => format!("no call shapes for {}", self.operation),
        }
    }
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no call shape accepted for {}", self.operation)?;
        if !self.attempts.is_empty() {
            let tried: Vec<String> = self
                .attempts
                .iter()
                .map(|(shape, err)| format!("{shape}: {err}"))
                .collect();
            write!(f, " (tried {})", tried.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for Unresolved {}

impl<'a, T> SignatureResolver<'a, T> {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            candidates: Vec::new(),
            halt_on_engine_failure: false,
        }
    }

    /// Stop at the first candidate the host executed and raised on, instead of
    /// trying later shapes. Used where a second form would repeat real work.
    pub fn halt_on_engine_failure(mut self) -> Self {
        self.halt_on_engine_failure = true;
        self
    }

    /// Append a candidate form.
    pub fn shape(
        mut self,
        shape: &'static str,
        attempt: impl FnOnce() -> DispatchResult<T> + 'a,
    ) -> Self {
        self.candidates.push((shape, Box::new(attempt)));
        self
    }

    /// Append a candidate form only when `enabled`.
    pub fn shape_if(
        self,
        enabled: bool,
        shape: &'static str,
        attempt: impl FnOnce() -> DispatchResult<T> + 'a,
    ) -> Self {
        if enabled { self.shape(shape, attempt) } else { self }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Try each candidate in order; the first success wins.
    pub fn resolve(self) -> Result<Resolved<T>, Unresolved> {
        let operation = self.operation;
        let halt_on_engine_failure = self.halt_on_engine_failure;
        let mut attempts = Vec::new();
        for (shape, attempt) in self.candidates {
            match attempt() {
                Ok(value) => {
                    debug!(operation, shape, rejected = attempts.len(), "call shape accepted");
                    return Ok(Resolved {
                        shape,
                        value,
                        rejected: attempts.len(),
                    });
                }
                Err(err) => {
                    trace!(operation, shape, error = %err, "call shape rejected");
                    let halt = halt_on_engine_failure && err.is_engine_failure();
                    attempts.push((shape, err));
                    if halt {
                        break;
                    }
                }
            }
        }
        debug!(operation, tried = attempts.len(), "no call shape accepted");
        Err(Unresolved {
            operation,
            attempts,
        })
    }
}
