//! Single-actor and multi-actor admission policies.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::SeedableRng;
use tracing::{debug, trace};

use super::registry::{Actor, ActorRegistry};
use super::window::WindowCounter;
use crate::error::{GateError, Result};

/// Registry shared between policies, guarded by a single lock.
pub type SharedRegistry = Arc<Mutex<ActorRegistry>>;

/// Default quiet period after each admitted event.
const DEFAULT_COOLDOWN_SECS: i64 = 300;
/// Default length of the capped window.
const DEFAULT_WINDOW_SECS: i64 = 3600;
/// Default number of events allowed per capped window.
const DEFAULT_MAX_PER_WINDOW: usize = 5;

/// The caps an actor must satisfy to be eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// No event may fall inside this trailing period
    pub cooldown: Duration,
    /// Trailing period over which `max_per_window` applies
    pub window: Duration,
    /// Events allowed per `window`
    pub max_per_window: usize,
    /// Age at which recorded events are pruned
    pub retention: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            cooldown: Duration::seconds(DEFAULT_COOLDOWN_SECS),
            window: Duration::seconds(DEFAULT_WINDOW_SECS),
            max_per_window: DEFAULT_MAX_PER_WINDOW,
            retention: Duration::seconds(DEFAULT_WINDOW_SECS),
        }
    }
}

impl Limits {
    /// Create validated limits.
    pub fn new(
        cooldown: Duration,
        window: Duration,
        max_per_window: usize,
        retention: Duration,
    ) -> Result<Self> {
        let limits = Self {
            cooldown,
            window,
            max_per_window,
            retention,
        };
        limits.validate()?;
        Ok(limits)
    }

    /// Check that every period is positive and the cap allows at least one event.
    pub fn validate(&self) -> Result<()> {
        for (name, period) in [
            ("cooldown", self.cooldown),
            ("window", self.window),
            ("retention", self.retention),
        ] {
            if period <= Duration::zero() {
                return Err(GateError::InvalidArgument(format!(
                    "{} must be positive, got {}s",
                    name,
                    period.num_seconds()
                )));
            }
        }
        if self.max_per_window == 0 {
            return Err(GateError::InvalidArgument(
                "max_per_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `counter` satisfies both caps at `time`.
    pub fn is_eligible(&self, counter: &WindowCounter, time: DateTime<Utc>) -> Result<bool> {
        let recent = counter.count_in_window(self.cooldown, time)?;
        let windowed = counter.count_in_window(self.window, time)?;
        trace!(recent, windowed, "Counted events");
        Ok(recent == 0 && windowed < self.max_per_window)
    }
}

/// A policy answering "can admit?" and "admit" for a given instant.
///
/// Callers supply the time; policies never read the clock.
pub trait AdmissionPolicy: Send + Sync {
    /// Whether an admission at `time` would succeed.
    fn can_admit(&self, time: DateTime<Utc>) -> Result<bool>;

    /// Admit at `time` if possible, recording the event.
    ///
    /// Returns `false` without side effects when nobody is eligible.
    fn admit(&self, time: DateTime<Utc>) -> Result<bool>;
}

/// Gates a single fixed actor.
pub struct SingleActorPolicy {
    /// The actor every admission is recorded against
    actor: Actor,
    /// Counters, possibly shared with other policies
    registry: SharedRegistry,
    /// Caps to enforce
    limits: Limits,
}

impl SingleActorPolicy {
    /// Create a policy with a private registry holding only `actor`.
    pub fn new(actor: impl Into<Actor>, limits: Limits) -> Result<Self> {
        limits.validate()?;
        let actor = actor.into();
        let registry = ActorRegistry::with_retention([actor.clone()], limits.retention)?;
        Ok(Self {
            actor,
            registry: Arc::new(Mutex::new(registry)),
            limits,
        })
    }

    /// Create a policy over an existing registry.
    ///
    /// Fails with `UnknownActor` if `actor` is not registered.
    pub fn with_registry(
        actor: impl Into<Actor>,
        registry: SharedRegistry,
        limits: Limits,
    ) -> Result<Self> {
        limits.validate()?;
        let actor = actor.into();
        if !registry.lock().contains(&actor) {
            return Err(GateError::UnknownActor(actor.to_string()));
        }
        Ok(Self {
            actor,
            registry,
            limits,
        })
    }

    /// The gated actor.
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// The registry this policy reads and writes.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    fn check(&self, registry: &ActorRegistry, time: DateTime<Utc>) -> Result<bool> {
        let counter = registry.counter_for(&self.actor)?;
        self.limits.is_eligible(counter, time)
    }
}

impl AdmissionPolicy for SingleActorPolicy {
    fn can_admit(&self, time: DateTime<Utc>) -> Result<bool> {
        let registry = self.registry.lock();
        self.check(&registry, time)
    }

    fn admit(&self, time: DateTime<Utc>) -> Result<bool> {
        let mut registry = self.registry.lock();
        if !self.check(&registry, time)? {
            debug!(actor = %self.actor, time = %time, "Admission denied");
            return Ok(false);
        }

        registry.record(&self.actor, time)?;
        debug!(actor = %self.actor, time = %time, "Admission recorded");
        Ok(true)
    }
}

/// Admits through any actor that individually satisfies the caps.
///
/// When several actors qualify one is picked uniformly at random.
pub struct MultiActorPolicy {
    /// Counters, possibly shared with other policies
    registry: SharedRegistry,
    /// Caps to enforce per actor
    limits: Limits,
    /// Source for picking among eligible actors
    rng: Mutex<StdRng>,
}

impl MultiActorPolicy {
    /// Create a policy with a private registry of `actors`.
    pub fn new<I, A>(actors: I, limits: Limits) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<Actor>,
    {
        limits.validate()?;
        let registry = ActorRegistry::with_retention(actors, limits.retention)?;
        Self::with_registry(Arc::new(Mutex::new(registry)), limits)
    }

    /// Create a policy over an existing registry.
    pub fn with_registry(registry: SharedRegistry, limits: Limits) -> Result<Self> {
        limits.validate()?;
        Ok(Self {
            registry,
            limits,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Use a deterministic selection sequence.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// The registry this policy reads and writes.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Actors satisfying both caps at `time`.
    pub fn eligible_actors(&self, time: DateTime<Utc>) -> Result<BTreeSet<Actor>> {
        let registry = self.registry.lock();
        self.eligible(&registry, time)
    }

    fn eligible(&self, registry: &ActorRegistry, time: DateTime<Utc>) -> Result<BTreeSet<Actor>> {
        let recent = registry.window_counts(self.limits.cooldown, time)?;
        let windowed = registry.window_counts(self.limits.window, time)?;

        let quiet: BTreeSet<&Actor> = recent
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(actor, _)| actor)
            .collect();
        let under_cap: BTreeSet<&Actor> = windowed
            .iter()
            .filter(|(_, count)| **count < self.limits.max_per_window)
            .map(|(actor, _)| actor)
            .collect();

        Ok(quiet.intersection(&under_cap).map(|a| (*a).clone()).collect())
    }
}

impl AdmissionPolicy for MultiActorPolicy {
    fn can_admit(&self, time: DateTime<Utc>) -> Result<bool> {
        Ok(!self.eligible_actors(time)?.is_empty())
    }

    fn admit(&self, time: DateTime<Utc>) -> Result<bool> {
        let mut registry = self.registry.lock();
        let eligible = self.eligible(&registry, time)?;

        let chosen = {
            let mut rng = self.rng.lock();
            eligible.iter().choose(&mut *rng).cloned()
        };
        let Some(actor) = chosen else {
            debug!(time = %time, "No eligible actor, admission denied");
            return Ok(false);
        };

        registry.record(&actor, time)?;
        debug!(
            actor = %actor,
            eligible = eligible.len(),
            time = %time,
            "Admission recorded"
        );
        Ok(true)
    }
}
