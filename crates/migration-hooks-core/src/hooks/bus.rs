//! Outward event bus - lets hosts observe dispatches through their own event system

use std::sync::Arc;

use super::context::HookContext;

/// Receiver for the synthetic `migration_hooks.*` events
pub trait EventBus: Send + Sync {
    /// Called once per dispatch, before registry callbacks run
    fn publish(&self, event_name: &str, context: &HookContext);
}

impl<F> EventBus for F
where
    F: Fn(&str, &HookContext) + Send + Sync,
{
    fn publish(&self, event_name: &str, context: &HookContext) {
        self(event_name, context)
    }
}

/// Registry that broadcasts events to multiple buses
#[derive(Clone, Default)]
pub struct EventBusRegistry {
    buses: Vec<Arc<dyn EventBus>>,
}

impl EventBusRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bus
    pub fn register<B: EventBus + 'static>(&mut self, bus: B) {
        self.buses.push(Arc::new(bus));
    }

    /// Get all registered buses
    pub fn all(&self) -> &[Arc<dyn EventBus>] {
        &self.buses
    }

    /// Check if the registry has no buses
    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }
}

impl EventBus for EventBusRegistry {
    fn publish(&self, event_name: &str, context: &HookContext) {
        for bus in &self.buses {
            bus.publish(event_name, context);
        }
    }
}

impl std::fmt::Debug for EventBusRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBusRegistry")
            .field("buses", &self.buses.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::event::{Direction, HookEvent};
    use std::sync::Mutex;

    #[test]
    fn test_broadcast_to_all_buses() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = EventBusRegistry::new();
        assert!(registry.is_empty());

        for label in ["first", "second"] {
            let seen = seen.clone();
            registry.register(move |name: &str, ctx: &HookContext| {
                seen.lock()
                    .unwrap()
                    .push(format!("{label}:{name}:{}", ctx.method));
            });
        }

        let ctx = HookContext::new(HookEvent::AllStarted, Direction::Down, "testing");
        registry.publish(&HookEvent::AllStarted.bus_name(), &ctx);

        assert_eq!(registry.all().len(), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "first:migration_hooks.all_started:down",
                "second:migration_hooks.all_started:down"
            ]
        );
    }
}
