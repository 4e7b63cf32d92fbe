//! Hook registry - priority-ordered callbacks per event
//!
//! Callbacks registered here run synchronously when the dispatcher handles the
//! matching lifecycle event. Lower priorities run first; callbacks sharing a
//! priority run in registration order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::context::HookContext;
use super::event::{Direction, HookEvent, Timing};

/// Priority used by the convenience registration methods
pub const DEFAULT_PRIORITY: i32 = 10;

/// A registered callback. Returning `Err` reports a callback failure.
pub type HookCallback = Arc<dyn Fn(&HookContext) -> anyhow::Result<()> + Send + Sync>;

/// A single callback entry
#[derive(Clone)]
pub struct HookRegistration {
    /// Event the callback is registered under
    pub event_name: String,
    /// The callback
    pub callback: HookCallback,
    /// Ordering key (lower runs first)
    pub priority: i32,
}

impl HookRegistration {
    /// Invoke the callback with the dispatch context
    pub fn call(&self, context: &HookContext) -> anyhow::Result<()> {
        (self.callback)(context)
    }
}

impl fmt::Debug for HookRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistration")
            .field("event_name", &self.event_name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Registry of callbacks organized by event name.
///
/// Registration is expected to finish before the first step runs. The
/// registry has no interior locking; hosts that share it across threads wrap
/// it in a single mutex guarding both registration and dispatch.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, Vec<HookRegistration>>,
}

impl HookRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for an event.
    ///
    /// Duplicates are not detected: registering the same callback twice
    /// produces two entries.
    pub fn register<F>(&mut self, event_name: impl Into<String>, callback: F, priority: i32)
    where
        F: Fn(&HookContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register_arc(event_name, Arc::new(callback), priority);
    }

    /// Register an already shared callback for an event
    pub fn register_arc(
        &mut self,
        event_name: impl Into<String>,
        callback: HookCallback,
        priority: i32,
    ) {
        let event_name = event_name.into();
        let entries = self.hooks.entry(event_name.clone()).or_default();

        entries.push(HookRegistration {
            event_name: event_name.clone(),
            callback,
            priority,
        });

        // sort_by_key is stable, equal priorities keep registration order
        entries.sort_by_key(|e| e.priority);

        debug!(event = %event_name, priority, count = entries.len(), "hook registered");
    }

    /// Get callbacks for an event in execution order
    pub fn get(&self, event_name: &str) -> &[HookRegistration] {
        self.hooks
            .get(event_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Check if there are any callbacks for an event
    pub fn has_hooks(&self, event_name: &str) -> bool {
        !self.get(event_name).is_empty()
    }

    /// Total number of registered callbacks
    pub fn len(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }

    /// Check if the registry holds no callbacks
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every registration.
    ///
    /// Meant for isolating test runs; never call it while a dispatch is running.
    pub fn clear(&mut self) {
        self.hooks.clear();
    }

    /// Register a callback for before any step runs
    pub fn before_all<F>(&mut self, callback: F, priority: i32)
    where
        F: Fn(&HookContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(HookEvent::AllStarted.as_str(), callback, priority);
    }

    /// Register a callback for after all steps complete
    pub fn after_all<F>(&mut self, callback: F, priority: i32)
    where
        F: Fn(&HookContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(HookEvent::AllEnded.as_str(), callback, priority);
    }

    /// Register a callback for before each individual step
    pub fn before_each<F>(&mut self, callback: F, priority: i32)
    where
        F: Fn(&HookContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(HookEvent::StepStarted.as_str(), callback, priority);
    }

    /// Register a callback for after each individual step
    pub fn after_each<F>(&mut self, callback: F, priority: i32)
    where
        F: Fn(&HookContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(HookEvent::StepEnded.as_str(), callback, priority);
    }

    /// Register a callback for steps whose identifier contains `step_identifier`.
    ///
    /// This is a substring match, not an equality check: registering for
    /// `"users"` fires for both `create_users_table` and `delete_all_users_log`.
    /// Use the full timestamped step name when only one step should match.
    pub fn register_for_step<F>(
        &mut self,
        step_identifier: impl Into<String>,
        callback: F,
        when: Timing,
        priority: i32,
    ) where
        F: Fn(&HookContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let needle = step_identifier.into();
        let event = match when {
            Timing::Before => HookEvent::StepStarted,
            Timing::After => HookEvent::StepEnded,
        };

        self.register(
            event.as_str(),
            move |ctx: &HookContext| {
                if ctx.step_name().contains(needle.as_str()) {
                    callback(ctx)
                } else {
                    Ok(())
                }
            },
            priority,
        );
    }
}

/// Wrap a callback so it only fires for forward (`up`) runs
pub fn only_if_forward<F>(callback: F) -> impl Fn(&HookContext) -> anyhow::Result<()> + Send + Sync
where
    F: Fn(&HookContext) -> anyhow::Result<()> + Send + Sync,
{
    only_if(Direction::Up, callback)
}

/// Wrap a callback so it only fires for reverse (`down`) runs
pub fn only_if_reverse<F>(callback: F) -> impl Fn(&HookContext) -> anyhow::Result<()> + Send + Sync
where
    F: Fn(&HookContext) -> anyhow::Result<()> + Send + Sync,
{
    only_if(Direction::Down, callback)
}

fn only_if<F>(direction: Direction, callback: F) -> impl Fn(&HookContext) -> anyhow::Result<()> + Send + Sync
where
    F: Fn(&HookContext) -> anyhow::Result<()> + Send + Sync,
{
    move |ctx: &HookContext| {
        if ctx.method == direction {
            callback(ctx)
        } else {
            Ok(())
        }
    }
}
