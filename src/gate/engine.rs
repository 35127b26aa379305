//! The process-wide gate: one registry shared by both policy versions.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use super::policy::{Limits, MultiActorPolicy, SharedRegistry, SingleActorPolicy};
use super::registry::{Actor, ActorRegistry};
use crate::config::GateConfig;
use crate::error::Result;

/// Owns the registry and the two policies reading it.
///
/// Admissions through the single-actor policy count against that actor in the
/// multi-actor policy as well.
pub struct Gate {
    registry: SharedRegistry,
    v1: SingleActorPolicy,
    v2: MultiActorPolicy,
}

impl Gate {
    /// Build a gate over `actors`, gating `v1_actor` alone for the single-actor policy.
    ///
    /// Fails with `UnknownActor` if `v1_actor` is not one of `actors`.
    pub fn new<I, A>(v1_actor: impl Into<Actor>, actors: I, limits: Limits) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<Actor>,
    {
        limits.validate()?;
        let registry: SharedRegistry = Arc::new(Mutex::new(ActorRegistry::with_retention(
            actors,
            limits.retention,
        )?));

        let v1 = SingleActorPolicy::with_registry(v1_actor, Arc::clone(&registry), limits)?;
        let v2 = MultiActorPolicy::with_registry(Arc::clone(&registry), limits)?;

        info!(
            v1_actor = %v1.actor(),
            actors = registry.lock().all_actors().len(),
            "Gate initialized"
        );

        Ok(Self { registry, v1, v2 })
    }

    /// Build a gate from startup configuration.
    pub fn from_config(config: &GateConfig) -> Result<Self> {
        let limits = config.limits.to_limits()?;
        Self::new(
            config.actors.v1.as_str(),
            config.actors.v2.iter().map(String::as_str),
            limits,
        )
    }

    /// The single-actor policy.
    pub fn v1(&self) -> &SingleActorPolicy {
        &self.v1
    }

    /// The multi-actor policy.
    pub fn v2(&self) -> &MultiActorPolicy {
        &self.v2
    }

    /// The shared registry.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Forget every recorded event.
    ///
    /// This is primarily useful for testing.
    pub fn reset(&self) {
        self.registry.lock().clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GateError;
    use crate::gate::{timestamp_from_secs, AdmissionPolicy};

    const T0: i64 = 1_514_764_800;

    #[test]
    fn test_gate_from_default_config() {
        let gate = Gate::from_config(&GateConfig::default()).unwrap();
        assert_eq!(gate.v1().actor().as_str(), "piddles");
        assert_eq!(gate.registry().lock().all_actors().len(), 3);
    }

    #[test]
    fn test_gate_rejects_unregistered_v1_actor() {
        let result = Gate::new("paddles", ["piddles", "puddles"], Limits::default());
        assert!(matches!(result, Err(GateError::UnknownActor(_))));
    }

    #[test]
    fn test_v1_admission_consumes_v2_capacity() {
        let gate = Gate::new("piddles", ["piddles"], Limits::default()).unwrap();
        let t0 = timestamp_from_secs(T0).unwrap();

        assert!(gate.v1().admit(t0).unwrap());
        assert!(!gate.v2().can_admit(t0).unwrap());

        gate.reset();
        assert!(gate.v2().can_admit(t0).unwrap());
    }
}
