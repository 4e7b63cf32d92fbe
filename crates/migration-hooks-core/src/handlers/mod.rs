//! Step handlers - per-step lifecycle operations resolved by step name
//!
//! A step handler exposes up to four operations, one per timing and
//! direction. Handlers come from a [`HandlerSource`]:
//! - [`FileHandlerSource`]: handler files in the hooks directory, named after the step
//! - [`StaticHandlerSource`]: factories registered in code
//!
//! Sources are consulted on every dispatch. Nothing is cached, so a handler
//! file edited during a long run takes effect at the next step.

mod budget;
mod command;
mod file;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::hooks::{Direction, HookContext, Timing};

pub use budget::{run_with_budget, BudgetFailure};
pub(crate) use budget::panic_message;
pub use command::{CommandSpec, ShellCommand};
pub use file::{FileHandlerSource, HandlerDefinition};

/// A handler operation. Returning `Err` reports an execution failure.
pub type HandlerFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// The four operations a step handler can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerOp {
    BeforeUp,
    AfterUp,
    BeforeDown,
    AfterDown,
}

impl HandlerOp {
    /// Operation for a timing and direction
    pub fn new(timing: Timing, direction: Direction) -> Self {
        match (timing, direction) {
            (Timing::Before, Direction::Up) => Self::BeforeUp,
            (Timing::After, Direction::Up) => Self::AfterUp,
            (Timing::Before, Direction::Down) => Self::BeforeDown,
            (Timing::After, Direction::Down) => Self::AfterDown,
        }
    }

    /// Key used for the operation in handler files
    pub fn key(&self) -> &'static str {
        match self {
            Self::BeforeUp => "before_up",
            Self::AfterUp => "after_up",
            Self::BeforeDown => "before_down",
            Self::AfterDown => "after_down",
        }
    }

    /// Method-style name used in logs (`beforeUp`, `afterDown`, ...)
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::BeforeUp => "beforeUp",
            Self::AfterUp => "afterUp",
            Self::BeforeDown => "beforeDown",
            Self::AfterDown => "afterDown",
        }
    }

    /// Get all operations in declaration order
    pub fn all() -> &'static [HandlerOp] {
        &[Self::BeforeUp, Self::AfterUp, Self::BeforeDown, Self::AfterDown]
    }

    fn index(&self) -> usize {
        match self {
            Self::BeforeUp => 0,
            Self::AfterUp => 1,
            Self::BeforeDown => 2,
            Self::AfterDown => 3,
        }
    }
}

impl fmt::Display for HandlerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Operation table for one step. Empty slots are no-ops.
#[derive(Clone, Default)]
pub struct StepHandler {
    slots: [Option<HandlerFn>; 4],
}

impl StepHandler {
    /// Create a handler with no operations
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an operation
    pub fn with<F>(mut self, op: HandlerOp, action: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.set(op, Arc::new(action));
        self
    }

    /// Set an operation from a shared function
    pub fn set(&mut self, op: HandlerOp, action: HandlerFn) {
        self.slots[op.index()] = Some(action);
    }

    /// Get an operation if the handler defines it
    pub fn get(&self, op: HandlerOp) -> Option<&HandlerFn> {
        self.slots[op.index()].as_ref()
    }

    /// Operations defined by this handler
    pub fn defined_ops(&self) -> Vec<HandlerOp> {
        HandlerOp::all()
            .iter()
            .copied()
            .filter(|op| self.get(*op).is_some())
            .collect()
    }
}

impl fmt::Debug for StepHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepHandler")
            .field("ops", &self.defined_ops())
            .finish()
    }
}

/// Reasons a handler could not be produced
#[derive(Debug, Error)]
pub enum LoadError {
    /// The handler exists but could not be read or evaluated
    #[error("{message}")]
    Evaluation { path: PathBuf, message: String },

    /// The handler evaluated to something that is not a handler definition
    #[error("{message}")]
    Shape { path: PathBuf, message: String },
}

impl LoadError {
    /// Location of the offending handler
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Evaluation { path, .. } | Self::Shape { path, .. } => path,
        }
    }

    /// Whether the handler evaluated but had the wrong shape
    pub fn is_shape(&self) -> bool {
        matches!(self, Self::Shape { .. })
    }
}

/// Resolves a step name to its handler
pub trait HandlerSource: Send + Sync {
    /// Load the handler for `step`.
    ///
    /// Returns `Ok(None)` when the step has no handler.
    fn load(&self, step: &str, context: &HookContext) -> Result<Option<StepHandler>, LoadError>;
}

/// Factory producing a fresh handler for each dispatch
pub type HandlerFactory = Arc<dyn Fn(&HookContext) -> StepHandler + Send + Sync>;

/// Handler source backed by factories registered in code
#[derive(Clone, Default)]
pub struct StaticHandlerSource {
    factories: HashMap<String, HandlerFactory>,
}

impl StaticHandlerSource {
    /// Create a new empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a step, replacing any previous one
    pub fn register<F>(&mut self, step: impl Into<String>, factory: F)
    where
        F: Fn(&HookContext) -> StepHandler + Send + Sync + 'static,
    {
        self.factories.insert(step.into(), Arc::new(factory));
    }

    /// Register a factory for a step (builder style)
    pub fn with<F>(mut self, step: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&HookContext) -> StepHandler + Send + Sync + 'static,
    {
        self.register(step, factory);
        self
    }

    /// Get the step names with registered factories
    pub fn steps(&self) -> Vec<&str> {
        let mut steps: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        steps.sort_unstable();
        steps
    }
}

impl HandlerSource for StaticHandlerSource {
    fn load(&self, step: &str, context: &HookContext) -> Result<Option<StepHandler>, LoadError> {
        Ok(self.factories.get(step).map(|factory| factory(context)))
    }
}

impl fmt::Debug for StaticHandlerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticHandlerSource")
            .field("steps", &self.steps())
            .finish()
    }
}
