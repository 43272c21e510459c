//! Notifications about profile declarations found during resolution.

use crate::core::Profile;
use parking_lot::Mutex;

/// What one loaded source declared, and what the resolution did with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationEvent {
    /// Name of the source holding the declarations
    pub source: String,
    /// Profiles queued because this source was the first to activate
    pub activated: Vec<Profile>,
    /// Profiles queued through `config.profiles.include`
    pub included: Vec<Profile>,
    /// Active profiles dropped because an earlier activation already happened
    pub ignored: Vec<Profile>,
}

impl ActivationEvent {
    /// Whether any declared profile was queued.
    pub fn changed_worklist(&self) -> bool {
        !self.activated.is_empty() || !self.included.is_empty()
    }
}

/// Callback invoked for every source that declares profiles.
///
/// Closures implement this trait:
///
/// ```rust
/// use layered_config::observer::{ActivationEvent, ProfileActivationObserver};
///
/// let observer = |event: &ActivationEvent| println!("{} declared profiles", event.source);
/// observer.on_activation(&ActivationEvent {
///     source: "applicationConfig: [classpath:/application.yml]".to_string(),
///     activated: vec![],
///     included: vec![],
///     ignored: vec![],
/// });
/// ```
pub trait ProfileActivationObserver: Send + Sync {
    /// Called once per declaring source, in load order.
    fn on_activation(&self, event: &ActivationEvent);
}

impl<F> ProfileActivationObserver for F
where
    F: Fn(&ActivationEvent) + Send + Sync,
{
    fn on_activation(&self, event: &ActivationEvent) {
        self(event)
    }
}

/// Observer that records every event, for inspection after resolution.
#[derive(Debug, Default)]
pub struct ActivationLog {
    events: Mutex<Vec<ActivationEvent>>,
}

impl ActivationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<ActivationEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop every recorded event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ProfileActivationObserver for ActivationLog {
    fn on_activation(&self, event: &ActivationEvent) {
        self.events.lock().push(event.clone());
    }
}
