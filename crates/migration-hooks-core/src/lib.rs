//! Migration Hooks Core - Lifecycle hooks for schema migration runs
//!
//! This crate provides the hook registry, the dispatch engine that runs step
//! handlers and registered callbacks around each migration, configuration,
//! error handling and the handler scaffolding used by the CLI.

pub mod config;
pub mod coverage;
pub mod error;
pub mod handlers;
pub mod hooks;
pub mod step;
pub mod templates;

pub use config::HooksConfig;
pub use coverage::{scan_coverage, CoverageReport, HookCoverage};
pub use error::{ConfigError, DispatchError, HooksError, Result, ScaffoldError};
pub use handlers::{
    FileHandlerSource, HandlerOp, HandlerSource, LoadError, StaticHandlerSource, StepHandler,
};
pub use hooks::{
    only_if_forward, only_if_reverse, Direction, DispatchReport, Dispatcher, EventBus,
    HookContext, HookEvent, HookRegistry, LifecycleSignal, Timing,
};
pub use step::{step_identifier, MigrationStep, PathStep};
pub use templates::create_handler_file;
