//! Transition guards.
//!
//! A guard decides whether a transition may fire for a given event and, if
//! so, extends the merged input token with newly captured variables. The
//! closed set of guard kinds is dispatched by pattern match; the DSL only
//! ever produces the API-call form, with `Identity` standing in for
//! transitions declared without a condition.

use std::fmt;

use crate::ast::Expression;
use crate::error::Result;
use crate::eval::{expr, Token};
use crate::event::{EventValue, ExecutionEvent};

/// Guard attached to a transition.
#[derive(Debug, Clone, Default)]
pub enum TransitionGuard {
    /// Always satisfied, never alters the token.
    #[default]
    Identity,
    /// Matches one API/syscall event and captures values into the token.
    ApiCall(ApiCallGuard),
}

impl TransitionGuard {
    /// The API name this guard statically matches on, if any. The analyzer
    /// uses this to skip enablement checks for events that cannot match.
    pub fn api_name(&self) -> Option<&str> {
        match self {
            TransitionGuard::Identity => None,
            TransitionGuard::ApiCall(guard) => guard.api_name(),
        }
    }

    /// Matches the guard against an event, binding captured variables into
    /// `token` by side effect.
    ///
    /// On `Ok(false)` the token may hold partial captures and must be
    /// discarded by the caller. Constraint evaluation faults (undefined
    /// variable, non-boolean constraint) propagate as hard errors: they are
    /// defects in the compiled net, not per-event conditions.
    pub fn evaluate(&self, event: &ExecutionEvent, token: &mut Token) -> Result<bool> {
        match self {
            TransitionGuard::Identity => Ok(true),
            TransitionGuard::ApiCall(guard) => guard.evaluate(event, token),
        }
    }
}

impl From<ApiCallGuard> for TransitionGuard {
    fn from(guard: ApiCallGuard) -> Self {
        TransitionGuard::ApiCall(guard)
    }
}

impl fmt::Display for TransitionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionGuard::Identity => f.write_str("true"),
            TransitionGuard::ApiCall(guard) => guard.fmt(f),
        }
    }
}

/// Guard matching a single API/syscall invocation.
///
/// Argument capture slots are index-aligned with the event's argument list;
/// a `None` slot ignores that argument. Capturing into a variable the token
/// already binds turns the capture into an equality check.
#[derive(Debug, Clone, Default)]
pub struct ApiCallGuard {
    name: Option<String>,
    arguments: Vec<Option<String>>,
    return_value: Option<String>,
    process: Option<String>,
    thread: Option<String>,
    constraints: Vec<Expression>,
}

impl ApiCallGuard {
    /// Creates a guard matching events named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Creates a guard that matches every event unconditionally.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn api_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn arguments(&self) -> &[Option<String>] {
        &self.arguments
    }

    pub fn return_capture(&self) -> Option<&str> {
        self.return_value.as_deref()
    }

    pub fn process_capture(&self) -> Option<&str> {
        self.process.as_deref()
    }

    pub fn thread_capture(&self) -> Option<&str> {
        self.thread.as_deref()
    }

    pub fn constraints(&self) -> &[Expression] {
        &self.constraints
    }

    /// Captures the argument at `index` into the named variable, growing the
    /// slot list with ignored slots as needed.
    pub fn capture_argument(mut self, index: usize, name: impl Into<String>) -> Self {
        if self.arguments.len() <= index {
            self.arguments.resize(index + 1, None);
        }
        self.arguments[index] = Some(name.into());
        self
    }

    /// Reserves `count` argument slots without capturing any of them.
    pub fn with_argument_count(mut self, count: usize) -> Self {
        if self.arguments.len() < count {
            self.arguments.resize(count, None);
        }
        self
    }

    pub fn capture_return(mut self, name: impl Into<String>) -> Self {
        self.return_value = Some(name.into());
        self
    }

    pub fn capture_process(mut self, name: impl Into<String>) -> Self {
        self.process = Some(name.into());
        self
    }

    pub fn capture_thread(mut self, name: impl Into<String>) -> Self {
        self.thread = Some(name.into());
        self
    }

    pub fn with_constraint(mut self, constraint: Expression) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn evaluate(&self, event: &ExecutionEvent, token: &mut Token) -> Result<bool> {
        // A guard without a name matches any event as-is.
        let Some(name) = &self.name else {
            return Ok(true);
        };

        if event.name != *name {
            return Ok(false);
        }

        // Arguments: capture or check equality against an earlier capture.
        for (slot, value) in self.arguments.iter().zip(&event.arguments) {
            if let Some(variable) = slot {
                if !match_and_bind(token, variable, value.clone()) {
                    return Ok(false);
                }
            }
        }

        if let Some(variable) = &self.return_value {
            let value = event.return_value.clone().unwrap_or(EventValue::Unresolved);
            if !match_and_bind(token, variable, value) {
                return Ok(false);
            }
        }

        if let Some(variable) = &self.process {
            if !match_and_bind(token, variable, EventValue::UInt(event.process_id as u64)) {
                return Ok(false);
            }
        }

        if let Some(variable) = &self.thread {
            if !match_and_bind(token, variable, EventValue::UInt(event.thread_id as u64)) {
                return Ok(false);
            }
        }

        // The reserved names pid/tid are always visible to constraints, but
        // are not persisted into the output token.
        let scratch = token
            .set("pid", event.process_id as u64)
            .set("tid", event.thread_id as u64);

        for constraint in &self.constraints {
            if !expr::evaluate(constraint, &scratch)?.as_bool()? {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Binds `value` to `variable`, or checks equality if the token already
/// binds it. Returns `false` on a mismatch.
fn match_and_bind(token: &mut Token, variable: &str, value: EventValue) -> bool {
    match token.get(variable) {
        Some(existing) => *existing == value,
        None => {
            *token = token.set(variable, value);
            true
        }
    }
}

impl fmt::Display for ApiCallGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name.as_deref().unwrap_or("_"))?;
        for (i, slot) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(slot.as_deref().unwrap_or("_"))?;
        }
        f.write_str(")")?;

        if let Some(ret) = &self.return_value {
            write!(f, " -> {ret}")?;
        }

        if self.process.is_some() || self.thread.is_some() {
            f.write_str("\nin\n")?;
            if let Some(process) = &self.process {
                write!(f, "   process {process}")?;
            }
            if let Some(thread) = &self.thread {
                if self.process.is_some() {
                    f.write_str("\n")?;
                }
                write!(f, "   thread {thread}")?;
            }
        }

        if !self.constraints.is_empty() {
            f.write_str("\nwhere")?;
            for constraint in &self.constraints {
                write!(f, "\n   {constraint}")?;
            }
        }

        Ok(())
    }
}
