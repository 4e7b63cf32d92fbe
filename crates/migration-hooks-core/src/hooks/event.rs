//! Lifecycle events, directions and host signals

use std::fmt;
use std::sync::Arc;

use crate::step::MigrationStep;

/// Prefix for events published to the host's event bus
pub const BUS_EVENT_PREFIX: &str = "migration_hooks";

/// Direction a migration step runs in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Apply the step
    #[default]
    Up,
    /// Undo the step
    Down,
}

impl Direction {
    /// Get the direction name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    /// Parse direction from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "up" | "forward" => Some(Self::Up),
            "down" | "reverse" | "rollback" => Some(Self::Down),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a hook runs before or after the step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timing {
    Before,
    After,
}

impl Timing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

/// The four reserved lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// Before the first step of a run
    AllStarted,
    /// After the last step of a run
    AllEnded,
    /// Before each individual step
    StepStarted,
    /// After each individual step
    StepEnded,
}

impl HookEvent {
    /// Get the registry event name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllStarted => "all_started",
            Self::AllEnded => "all_ended",
            Self::StepStarted => "step_started",
            Self::StepEnded => "step_ended",
        }
    }

    /// Parse event from its registry name
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "all_started" => Some(Self::AllStarted),
            "all_ended" => Some(Self::AllEnded),
            "step_started" => Some(Self::StepStarted),
            "step_ended" => Some(Self::StepEnded),
            _ => None,
        }
    }

    /// Get all events in the order a run raises them
    pub fn all() -> &'static [HookEvent] {
        &[
            Self::AllStarted,
            Self::StepStarted,
            Self::StepEnded,
            Self::AllEnded,
        ]
    }

    /// Whether the event concerns a single step
    pub fn is_step_event(&self) -> bool {
        matches!(self, Self::StepStarted | Self::StepEnded)
    }

    /// Handler timing for this event
    pub fn timing(&self) -> Timing {
        match self {
            Self::AllStarted | Self::StepStarted => Timing::Before,
            Self::AllEnded | Self::StepEnded => Timing::After,
        }
    }

    /// Name published on the host's event bus
    pub fn bus_name(&self) -> String {
        format!("{}.{}", BUS_EVENT_PREFIX, self.as_str())
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications raised by the host's migration driver
#[derive(Debug, Clone)]
pub enum LifecycleSignal {
    /// A run is about to execute its steps
    AllStarted { direction: Direction },
    /// A run finished executing its steps
    AllEnded { direction: Direction },
    /// A step is about to run
    StepStarted {
        direction: Direction,
        step: Arc<dyn MigrationStep>,
    },
    /// A step finished running
    StepEnded {
        direction: Direction,
        step: Arc<dyn MigrationStep>,
    },
}

impl LifecycleSignal {
    /// Event raised by this signal
    pub fn event(&self) -> HookEvent {
        match self {
            Self::AllStarted { .. } => HookEvent::AllStarted,
            Self::AllEnded { .. } => HookEvent::AllEnded,
            Self::StepStarted { .. } => HookEvent::StepStarted,
            Self::StepEnded { .. } => HookEvent::StepEnded,
        }
    }

    /// Direction carried by this signal
    pub fn direction(&self) -> Direction {
        match self {
            Self::AllStarted { direction }
            | Self::AllEnded { direction }
            | Self::StepStarted { direction, .. }
            | Self::StepEnded { direction, .. } => *direction,
        }
    }
}
