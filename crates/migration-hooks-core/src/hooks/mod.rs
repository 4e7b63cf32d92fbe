//! Hook system - callbacks and step handlers around migration runs
//!
//! A run raises four lifecycle events:
//! - all_started: before the first step
//! - step_started: before each step
//! - step_ended: after each step
//! - all_ended: after the last step
//!
//! For each event the [`Dispatcher`] runs the step's handler (per-step events
//! only), publishes `migration_hooks.<event>` on the registered event buses and
//! then runs the [`HookRegistry`] callbacks in priority order.

mod bus;
mod context;
mod dispatcher;
mod event;
mod registry;

pub use bus::{EventBus, EventBusRegistry};
pub use context::HookContext;
pub use dispatcher::{DispatchReport, Dispatcher, HandlerRun};
pub use event::{Direction, HookEvent, LifecycleSignal, Timing, BUS_EVENT_PREFIX};
pub use registry::{
    only_if_forward, only_if_reverse, HookCallback, HookRegistration, HookRegistry,
    DEFAULT_PRIORITY,
};
