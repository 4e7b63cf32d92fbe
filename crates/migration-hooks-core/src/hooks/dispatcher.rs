//! Dispatch engine - turns lifecycle signals into handler runs and callbacks

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::HooksConfig;
use crate::error::{DispatchError, Result};
use crate::handlers::{
    panic_message, run_with_budget, BudgetFailure, FileHandlerSource, HandlerOp, HandlerSource,
};
use crate::step::{step_identifier, MigrationStep};

use super::bus::{EventBus, EventBusRegistry};
use super::context::HookContext;
use super::event::{Direction, HookEvent, LifecycleSignal};
use super::registry::HookRegistry;

/// The handler operation run during a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerRun {
    /// Operation invoked
    pub op: HandlerOp,
    /// Wall-clock time spent in the operation
    pub duration: Duration,
    /// Whether the operation completed without error
    pub succeeded: bool,
}

/// Outcome of one dispatch that did not halt
#[derive(Debug)]
pub struct DispatchReport {
    /// Event dispatched
    pub event: HookEvent,
    /// Step identifier (per-step events only)
    pub step: Option<String>,
    /// Handler operation run, if the step had one for this event
    pub handler: Option<HandlerRun>,
    /// Number of registry callbacks invoked
    pub callbacks_run: usize,
    /// Failures logged and swallowed because `halt_on_error` is off
    pub failures: Vec<DispatchError>,
    /// Non-fatal problems such as malformed handler files outside strict mode
    pub warnings: Vec<String>,
}

impl DispatchReport {
    fn new(context: &HookContext) -> Self {
        Self {
            event: context.event,
            step: context.step_identifier.clone(),
            handler: None,
            callbacks_run: 0,
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Whether the dispatch finished without failures or warnings
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.warnings.is_empty()
    }
}

/// Bridges the host's lifecycle signals to step handlers and registry callbacks.
///
/// Every dispatch is synchronous: the caller blocks until the step handler and
/// all callbacks for the event have finished.
pub struct Dispatcher {
    config: HooksConfig,
    registry: HookRegistry,
    handlers: Box<dyn HandlerSource>,
    bus: EventBusRegistry,
    connection: String,
}

impl Dispatcher {
    /// Create a dispatcher resolving handlers through `handlers`
    pub fn new(config: HooksConfig, handlers: impl HandlerSource + 'static) -> Self {
        let connection = config.connection.clone();
        Self {
            config,
            registry: HookRegistry::new(),
            handlers: Box::new(handlers),
            bus: EventBusRegistry::new(),
            connection,
        }
    }

    /// Create a dispatcher reading handler files from the configured hooks
    /// directory, resolved against `base_dir`
    pub fn from_config(config: HooksConfig, base_dir: &Path) -> Self {
        let source = FileHandlerSource::new(config.hooks_dir(base_dir), config.extension.clone())
            .with_timeout(config.budget());
        Self::new(config, source)
    }

    /// Set the connection identifier passed to hooks
    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    /// Add an event bus receiving `migration_hooks.*` events
    pub fn with_event_bus<B: EventBus + 'static>(mut self, bus: B) -> Self {
        self.register_bus(bus);
        self
    }

    /// Add an event bus receiving `migration_hooks.*` events
    pub fn register_bus<B: EventBus + 'static>(&mut self, bus: B) {
        self.bus.register(bus);
    }

    /// Get the callback registry
    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Get the callback registry for registration
    pub fn registry_mut(&mut self) -> &mut HookRegistry {
        &mut self.registry
    }

    /// Get the active configuration
    pub fn config(&self) -> &HooksConfig {
        &self.config
    }

    /// Get the connection identifier
    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// Dispatch a host signal
    pub fn handle(&self, signal: LifecycleSignal) -> Result<DispatchReport> {
        match signal {
            LifecycleSignal::AllStarted { direction } => self.all_started(direction),
            LifecycleSignal::AllEnded { direction } => self.all_ended(direction),
            LifecycleSignal::StepStarted { direction, step } => self.step_started(direction, step),
            LifecycleSignal::StepEnded { direction, step } => self.step_ended(direction, step),
        }
    }

    /// A run is about to execute its steps
    pub fn all_started(&self, direction: Direction) -> Result<DispatchReport> {
        self.dispatch_run(HookEvent::AllStarted, direction)
    }

    /// A run finished executing its steps
    pub fn all_ended(&self, direction: Direction) -> Result<DispatchReport> {
        self.dispatch_run(HookEvent::AllEnded, direction)
    }

    /// A step is about to run
    pub fn step_started(
        &self,
        direction: Direction,
        step: Arc<dyn MigrationStep>,
    ) -> Result<DispatchReport> {
        self.dispatch_step(HookEvent::StepStarted, direction, step)
    }

    /// A step finished running
    pub fn step_ended(
        &self,
        direction: Direction,
        step: Arc<dyn MigrationStep>,
    ) -> Result<DispatchReport> {
        self.dispatch_step(HookEvent::StepEnded, direction, step)
    }

    fn dispatch_run(&self, event: HookEvent, direction: Direction) -> Result<DispatchReport> {
        let context = HookContext::new(event, direction, self.connection.as_str());
        let mut report = DispatchReport::new(&context);

        self.emit(&context, &mut report)?;
        Ok(report)
    }

    fn dispatch_step(
        &self,
        event: HookEvent,
        direction: Direction,
        step: Arc<dyn MigrationStep>,
    ) -> Result<DispatchReport> {
        let file_path = step.file_path();
        let context = HookContext::new(event, direction, self.connection.as_str())
            .with_step_identifier(step_identifier(file_path.as_deref()))
            .with_file_path(file_path)
            .with_migration(step);
        let mut report = DispatchReport::new(&context);

        if self.config.enabled {
            self.run_step_handler(&context, &mut report)?;
        } else {
            debug!(event = %event, step = context.step_name(), "hooks disabled, skipping step handler");
        }

        self.emit(&context, &mut report)?;
        Ok(report)
    }

    fn run_step_handler(&self, context: &HookContext, report: &mut DispatchReport) -> Result<()> {
        let step = match context.step_identifier.as_deref() {
            Some(step) if !step.is_empty() => step,
            _ => {
                debug!(event = %context.event, "no step identifier, skipping step handler");
                return Ok(());
            }
        };

        let handler = match self.handlers.load(step, context) {
            Ok(Some(handler)) => handler,
            Ok(None) => return Ok(()),
            Err(e) => {
                let shape = e.is_shape();
                let err = DispatchError::HandlerLoad {
                    step: step.to_string(),
                    path: e.path().clone(),
                    message: e.to_string(),
                };

                if !shape {
                    return self.settle(err, report);
                }
                if self.config.strict_mode {
                    error!(step, error = %err, "invalid hook file in strict mode");
                    return Err(err.into());
                }
                warn!(step, path = %e.path().display(), "{e}");
                report.warnings.push(e.to_string());
                return Ok(());
            }
        };

        let op = HandlerOp::new(context.event.timing(), context.method);
        let Some(action) = handler.get(op) else {
            debug!(step, method = %op, "hook does not define operation");
            return Ok(());
        };

        let start = Instant::now();
        let outcome = run_with_budget(action, self.config.budget());
        let duration = start.elapsed();

        report.handler = Some(HandlerRun {
            op,
            duration,
            succeeded: outcome.is_ok(),
        });

        match outcome {
            Ok(()) => {
                if self.config.log_execution {
                    info!(
                        migration = step,
                        method = %op,
                        duration_ms = duration.as_millis() as u64,
                        "Migration hook executed"
                    );
                }
                Ok(())
            }
            Err(BudgetFailure::TimedOut(budget)) => {
                report.warnings.push(format!(
                    "{op} for {step} exceeded its {}s budget and may still be running",
                    budget.as_secs()
                ));
                self.settle(DispatchError::timeout(step, op, budget.as_secs()), report)
            }
            Err(failure) => self.settle(
                DispatchError::HandlerExecution {
                    step: step.to_string(),
                    operation: op,
                    message: failure.to_string(),
                    timed_out: false,
                },
                report,
            ),
        }
    }

    /// Publish the bus event, then run the registry callbacks in order
    fn emit(&self, context: &HookContext, report: &mut DispatchReport) -> Result<()> {
        self.bus.publish(&context.event.bus_name(), context);

        for registration in self.registry.get(context.event.as_str()) {
            report.callbacks_run += 1;

            let message = match panic::catch_unwind(AssertUnwindSafe(|| registration.call(context))) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("{e:#}"),
                Err(payload) => format!("callback panicked: {}", panic_message(payload.as_ref())),
            };

            self.settle(
                DispatchError::RegistryCallback {
                    event: registration.event_name.clone(),
                    message,
                },
                report,
            )?;
        }

        Ok(())
    }

    /// Log a failure, then halt or record it according to `halt_on_error`
    fn settle(&self, err: DispatchError, report: &mut DispatchReport) -> Result<()> {
        error!(
            kind = err.kind(),
            event = %report.event,
            step = report.step.as_deref().unwrap_or(""),
            halt = self.config.halt_on_error,
            "{err}"
        );

        if self.config.halt_on_error {
            return Err(err.into());
        }
        report.failures.push(err);
        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("bus", &self.bus)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HooksError;
    use crate::handlers::{StaticHandlerSource, StepHandler};
    use crate::hooks::registry::DEFAULT_PRIORITY;
    use crate::hooks::Timing;
    use crate::step::PathStep;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    const USERS: &str = "/app/database/migrations/2024_01_01_000000_create_users_table.sql";

    fn users_step() -> Arc<dyn MigrationStep> {
        Arc::new(PathStep::new(USERS))
    }

    fn recording_source(log: Arc<Mutex<Vec<String>>>) -> StaticHandlerSource {
        StaticHandlerSource::new().with("2024_01_01_000000_create_users_table", move |_| {
            let before = log.clone();
            let after = log.clone();
            StepHandler::new()
                .with(HandlerOp::BeforeUp, move || {
                    before.lock().unwrap().push("beforeUp".to_string());
                    Ok(())
                })
                .with(HandlerOp::AfterUp, move || {
                    after.lock().unwrap().push("afterUp".to_string());
                    Ok(())
                })
        })
    }

    #[derive(Debug)]
    struct NoPath;

    impl MigrationStep for NoPath {
        fn file_path(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_callbacks_run_in_priority_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new(HooksConfig::default(), StaticHandlerSource::new());

        for (label, priority) in [("second", 20), ("first", 10), ("third", 30)] {
            let log = log.clone();
            dispatcher.registry_mut().after_all(
                move |_: &HookContext| {
                    log.lock().unwrap().push(label);
                    Ok(())
                },
                priority,
            );
        }

        let report = dispatcher.all_ended(Direction::Up).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(report.callbacks_run, 3);
        assert!(report.handler.is_none());
        assert!(report.is_clean());
    }

    #[test]
    fn test_run_context_carries_method_and_connection() {
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let mut dispatcher = Dispatcher::new(HooksConfig::default(), StaticHandlerSource::new())
            .with_connection("reporting");
        dispatcher.registry_mut().before_all(
            move |ctx: &HookContext| {
                *captured.lock().unwrap() =
                    Some((ctx.method, ctx.connection.clone(), ctx.step_identifier.clone()));
                Ok(())
            },
            DEFAULT_PRIORITY,
        );

        dispatcher.all_started(Direction::Down).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            Some((Direction::Down, "reporting".to_string(), None))
        );
    }

    #[test]
    fn test_step_handler_runs_matching_operation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new(HooksConfig::default(), recording_source(log.clone()));

        let started = dispatcher.step_started(Direction::Up, users_step()).unwrap();
        let ended = dispatcher.step_ended(Direction::Up, users_step()).unwrap();
        // No down operations defined
        dispatcher.step_started(Direction::Down, users_step()).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["beforeUp", "afterUp"]);
        assert_eq!(started.handler.map(|h| h.op), Some(HandlerOp::BeforeUp));
        assert_eq!(ended.handler.map(|h| h.op), Some(HandlerOp::AfterUp));
        assert_eq!(
            started.step.as_deref(),
            Some("2024_01_01_000000_create_users_table")
        );
    }

    #[test]
    fn test_disabled_skips_handlers_but_not_callbacks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let config = HooksConfig {
            enabled: false,
            ..Default::default()
        };
        let mut dispatcher = Dispatcher::new(config, recording_source(log.clone()));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        dispatcher.registry_mut().before_each(
            move |ctx: &HookContext| {
                captured.lock().unwrap().push((
                    ctx.step_identifier.clone(),
                    ctx.file_path.clone(),
                    ctx.migration.is_some(),
                ));
                Ok(())
            },
            DEFAULT_PRIORITY,
        );

        let report = dispatcher.step_started(Direction::Up, users_step()).unwrap();

        assert!(log.lock().unwrap().is_empty());
        assert!(report.handler.is_none());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(
                Some("2024_01_01_000000_create_users_table".to_string()),
                Some(USERS.to_string()),
                true
            )]
        );
    }

    #[test]
    fn test_missing_step_identifier_skips_handler() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let source = StaticHandlerSource::new().with("", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            StepHandler::new()
        });
        let dispatcher = Dispatcher::new(HooksConfig::default(), source);

        let report = dispatcher.step_started(Direction::Up, Arc::new(NoPath)).unwrap();
        assert!(report.step.is_none());
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_callback_failure_continues_without_halt() {
        let ran = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new(HooksConfig::default(), StaticHandlerSource::new());

        dispatcher
            .registry_mut()
            .after_each(|_: &HookContext| anyhow::bail!("cache flush failed"), 1);
        let counter = ran.clone();
        dispatcher.registry_mut().after_each(
            move |_: &HookContext| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            2,
        );

        let report = dispatcher.step_ended(Direction::Up, users_step()).unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind(), "registry_callback");
        assert!(report.failures[0].to_string().contains("cache flush failed"));
    }

    #[test]
    fn test_callback_failure_halts_with_halt_on_error() {
        let ran = Arc::new(AtomicUsize::new(0));
        let config = HooksConfig {
            halt_on_error: true,
            ..Default::default()
        };
        let mut dispatcher = Dispatcher::new(config, StaticHandlerSource::new());

        dispatcher
            .registry_mut()
            .after_all(|_: &HookContext| anyhow::bail!("notify failed"), 1);
        let counter = ran.clone();
        dispatcher.registry_mut().after_all(
            move |_: &HookContext| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            2,
        );

        let err = dispatcher.all_ended(Direction::Up).unwrap_err();
        assert!(matches!(
            err,
            HooksError::Dispatch(DispatchError::RegistryCallback { .. })
        ));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_callback_is_a_failure() {
        let mut dispatcher = Dispatcher::new(HooksConfig::default(), StaticHandlerSource::new());
        dispatcher
            .registry_mut()
            .before_all(|_: &HookContext| panic!("lost connection"), DEFAULT_PRIORITY);

        let report = dispatcher.all_started(Direction::Up).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].to_string().contains("lost connection"));
    }

    #[test]
    fn test_handler_failure_policy() {
        let source = StaticHandlerSource::new().with("2024_01_01_000000_create_users_table", |_| {
            StepHandler::new().with(HandlerOp::BeforeUp, || anyhow::bail!("backup failed"))
        });

        let dispatcher = Dispatcher::new(HooksConfig::default(), source.clone());
        let report = dispatcher.step_started(Direction::Up, users_step()).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.handler.map(|h| h.succeeded), Some(false));
        assert_eq!(
            report.failures[0].to_string(),
            "Migration hook failed for 2024_01_01_000000_create_users_table::beforeUp: backup failed"
        );

        let halting = Dispatcher::new(
            HooksConfig {
                halt_on_error: true,
                ..Default::default()
            },
            source,
        );
        let err = halting.step_started(Direction::Up, users_step()).unwrap_err();
        assert!(matches!(
            err,
            HooksError::Dispatch(DispatchError::HandlerExecution { .. })
        ));
    }

    #[test]
    fn test_handler_timeout() {
        let source = StaticHandlerSource::new().with("2024_01_01_000000_create_users_table", |_| {
            StepHandler::new().with(HandlerOp::AfterUp, || {
                std::thread::sleep(Duration::from_secs(3));
                Ok(())
            })
        });
        let config = HooksConfig {
            timeout: 1,
            halt_on_error: true,
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(config, source);

        let start = Instant::now();
        let err = dispatcher.step_ended(Direction::Up, users_step()).unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(3));
        match err {
            HooksError::Dispatch(e) => {
                assert!(e.is_timeout());
                assert!(e.to_string().ends_with("timeout after 1s"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn shape_fixture() -> (TempDir, Arc<dyn MigrationStep>) {
        let temp = TempDir::new().unwrap();
        let hooks = temp.path().join("database/hooks");
        std::fs::create_dir_all(&hooks).unwrap();
        std::fs::write(hooks.join("create_users_table.yaml"), "- not\n- a\n- hook\n").unwrap();
        let step: Arc<dyn MigrationStep> = Arc::new(PathStep::new(
            temp.path().join("database/migrations/create_users_table.sql"),
        ));
        (temp, step)
    }

    #[test]
    fn test_invalid_handler_warns_outside_strict_mode() {
        let (temp, step) = shape_fixture();
        let config = HooksConfig {
            extension: "yaml".to_string(),
            halt_on_error: true,
            ..Default::default()
        };
        let mut dispatcher = Dispatcher::from_config(config, temp.path());
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        dispatcher.registry_mut().register_for_step(
            "users",
            move |_: &HookContext| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            Timing::Before,
            DEFAULT_PRIORITY,
        );

        let report = dispatcher.step_started(Direction::Up, step).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.failures.is_empty());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalid_handler_fails_in_strict_mode() {
        let (temp, step) = shape_fixture();
        let config = HooksConfig {
            extension: "yaml".to_string(),
            strict_mode: true,
            ..Default::default()
        };
        let dispatcher = Dispatcher::from_config(config, temp.path());

        let err = dispatcher.step_started(Direction::Up, step).unwrap_err();
        assert!(matches!(
            err,
            HooksError::Dispatch(DispatchError::HandlerLoad { .. })
        ));
    }

    #[test]
    fn test_bus_receives_event_before_callbacks() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let bus_log = order.clone();
        let mut dispatcher = Dispatcher::new(HooksConfig::default(), StaticHandlerSource::new())
            .with_event_bus(move |name: &str, ctx: &HookContext| {
                bus_log
                    .lock()
                    .unwrap()
                    .push(format!("{name}:{}", ctx.step_name()));
            });
        let cb_log = order.clone();
        dispatcher.registry_mut().after_each(
            move |_: &HookContext| {
                cb_log.lock().unwrap().push("callback".to_string());
                Ok(())
            },
            DEFAULT_PRIORITY,
        );

        dispatcher
            .handle(LifecycleSignal::StepEnded {
                direction: Direction::Up,
                step: users_step(),
            })
            .unwrap();

        assert_eq!(
            *order.lock().unwrap(),
            vec![
                "migration_hooks.step_ended:2024_01_01_000000_create_users_table".to_string(),
                "callback".to_string()
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_handler_file_markers() {
        let temp = TempDir::new().unwrap();
        let hooks = temp.path().join("database/hooks");
        std::fs::create_dir_all(&hooks).unwrap();
        std::fs::write(
            hooks.join("2024_01_01_000000_create_users_table.toml"),
            "[before_up]\ncommand = \"echo before >> markers.log\"\ncwd = \".\"\n\n\
             [after_up]\ncommand = \"echo after >> markers.log\"\ncwd = \".\"\n",
        )
        .unwrap();

        let dispatcher = Dispatcher::from_config(HooksConfig::default(), temp.path());
        let step: Arc<dyn MigrationStep> = Arc::new(PathStep::new(
            temp.path()
                .join("database/migrations/2024_01_01_000000_create_users_table.sql"),
        ));

        let started = dispatcher.step_started(Direction::Up, step.clone()).unwrap();
        let ended = dispatcher.step_ended(Direction::Up, step).unwrap();

        assert!(started.is_clean());
        assert!(ended.is_clean());
        let markers = std::fs::read_to_string(hooks.join("markers.log")).unwrap();
        assert_eq!(markers, "before\nafter\n");
    }

    #[test]
    fn test_timeout_reports_operation_may_still_run() {
        let source = StaticHandlerSource::new().with("2024_01_01_000000_create_users_table", |_| {
            StepHandler::new().with(HandlerOp::BeforeUp, || {
                std::thread::sleep(Duration::from_secs(3));
                Ok(())
            })
        });
        let config = HooksConfig {
            timeout: 1,
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(config, source);

        let report = dispatcher.step_started(Direction::Up, users_step()).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].is_timeout());
        assert_eq!(
            report.warnings,
            vec![
                "beforeUp for 2024_01_01_000000_create_users_table exceeded its 1s budget \
                 and may still be running"
                    .to_string()
            ]
        );
    }

    fn unparsable_fixture() -> (TempDir, Arc<dyn MigrationStep>) {
        let temp = TempDir::new().unwrap();
        let hooks = temp.path().join("database/hooks");
        std::fs::create_dir_all(&hooks).unwrap();
        std::fs::write(hooks.join("create_users_table.toml"), "[before_up\ncommand = ").unwrap();
        let step: Arc<dyn MigrationStep> = Arc::new(PathStep::new(
            temp.path().join("database/migrations/create_users_table.sql"),
        ));
        (temp, step)
    }

    #[test]
    fn test_unparsable_handler_recorded_without_halt() {
        let (temp, step) = unparsable_fixture();
        let mut dispatcher = Dispatcher::from_config(HooksConfig::default(), temp.path());
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        dispatcher.registry_mut().before_each(
            move |_: &HookContext| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            DEFAULT_PRIORITY,
        );

        let report = dispatcher.step_started(Direction::Up, step).unwrap();
        let kinds: Vec<&str> = report.failures.iter().map(|f| f.kind()).collect();
        assert_eq!(kinds, vec!["handler_load"]);
        assert!(report.warnings.is_empty());
        assert!(report.handler.is_none());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unparsable_handler_halts_with_halt_on_error() {
        let (temp, step) = unparsable_fixture();
        let config = HooksConfig {
            halt_on_error: true,
            ..Default::default()
        };
        let dispatcher = Dispatcher::from_config(config, temp.path());

        let err = dispatcher.step_started(Direction::Up, step).unwrap_err();
        match err {
            HooksError::Dispatch(DispatchError::HandlerLoad { step, path, .. }) => {
                assert_eq!(step, "create_users_table");
                assert!(path.ends_with("database/hooks/create_users_table.toml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn captured_logs(log_execution: bool) -> String {
        use std::io;
        use tracing_subscriber::fmt::MakeWriter;

        #[derive(Clone)]
        struct BufferWriter(Arc<Mutex<Vec<u8>>>);

        impl io::Write for BufferWriter {
            fn write(&mut self, data: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(data);
                Ok(data.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        impl<'a> MakeWriter<'a> for BufferWriter {
            type Writer = BufferWriter;

            fn make_writer(&'a self) -> Self::Writer {
                self.clone()
            }
        }

        let buf = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .with_writer(BufferWriter(buf.clone()))
            .finish();

        let config = HooksConfig {
            log_execution,
            timeout: 0,
            ..Default::default()
        };
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new(config, recording_source(log));

        tracing::subscriber::with_default(subscriber, || {
            dispatcher.step_started(Direction::Up, users_step()).unwrap();
        });

        let bytes = buf.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_execution_logged_with_duration() {
        let logs = captured_logs(true);
        let line = logs
            .lines()
            .find(|l| l.contains("Migration hook executed"))
            .unwrap_or_else(|| panic!("no execution log line in: {logs}"));
        assert!(line.contains("migration=\"2024_01_01_000000_create_users_table\""));
        assert!(line.contains("method=beforeUp"));
        assert!(line.contains("duration_ms="));
    }

    #[test]
    fn test_execution_not_logged_when_disabled() {
        let logs = captured_logs(false);
        assert!(!logs.contains("Migration hook executed"), "unexpected log: {logs}");
    }
}
