//! Calling an external service with a default answer.
//!
//! Every AI endpoint must answer even when the model is down. Instead of a
//! try/catch-and-default block per endpoint, callers wrap the external call
//! in [`with_fallback`] and get back an [`Outcome`] saying which path was
//! taken.

use std::fmt::Display;
use std::future::Future;

use serde::Serialize;

/// Result of a call that may have fallen back to a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The external service answered.
    Live(T),
    /// The external service failed; this is the default value.
    Fallback(T),
}

impl<T> Outcome<T> {
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::Live(value) | Self::Fallback(value) => value,
        }
    }

    #[must_use]
    pub const fn get(&self) -> &T {
        match self {
            Self::Live(value) | Self::Fallback(value) => value,
        }
    }
}

/// Run `call`, replacing any error with `default()`.
///
/// The error is logged with `operation` as context and never reaches the
/// caller.
pub async fn with_fallback<T, E, Fut, D>(operation: &'static str, call: Fut, default: D) -> Outcome<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    D: FnOnce() -> T,
{
    match call.await {
        Ok(value) => Outcome::Live(value),
        Err(e) => {
            tracing::warn!(operation, error = %e, "External call failed, using fallback");
            Outcome::Fallback(default())
        }
    }
}

/// Wire shape of an endpoint answer that may be a fallback.
///
/// Live answers are `{ success: true, data }`. Fallbacks are
/// `{ success: false, fallback: true, error, data }` so the client can still
/// render `data`.
#[derive(Debug, Serialize)]
pub struct FallbackBody<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    pub data: T,
}

impl<T: Serialize> FallbackBody<T> {
    /// Shape an outcome, attaching `error` to fallbacks.
    pub fn from_outcome(outcome: Outcome<T>, error: &'static str) -> Self {
        match outcome {
            Outcome::Live(data) => Self {
                success: true,
                fallback: false,
                error: None,
                data,
            },
            Outcome::Fallback(data) => Self {
                success: false,
                fallback: true,
                error: Some(error),
                data,
            },
        }
    }
}
