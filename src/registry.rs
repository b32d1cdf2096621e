use std::sync::{Arc, OnceLock};

use crate::config::AdmissionConfig;
use crate::controller::AdmissionController;

/// Hands out one shared [`AdmissionController`] per registry.
///
/// A program builds a single registry at startup and passes it (or the
/// `Arc` from [`get`]) to every collector that talks to the rate-limited
/// upstream, so all of them funnel through the same windows and interval.
/// The controller is built lazily on first use; concurrent first calls are
/// safe and produce exactly one instance. Tests construct their own
/// registry, which keeps their state isolated from each other.
///
/// [`get`]: Self::get
#[derive(Debug, Default)]
pub struct ControllerRegistry {
    config: AdmissionConfig,
    instance: OnceLock<Arc<AdmissionController>>,
}

impl ControllerRegistry {
    /// Create a registry whose controller will use the given
    /// configuration.
    #[must_use]
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            config,
            instance: OnceLock::new(),
        }
    }

    /// The shared controller, built on first call
    #[must_use]
    pub fn get(&self) -> Arc<AdmissionController> {
        Arc::clone(self.instance.get_or_init(|| {
            Arc::new(AdmissionController::new(self.config.clone()))
        }))
    }

    /// Reset the shared controller if it has been built; a no-op
    /// otherwise. Used between unrelated work sessions.
    pub async fn reset(&self) {
        if let Some(controller) = self.instance.get() {
            controller.reset().await;
        }
    }
}
