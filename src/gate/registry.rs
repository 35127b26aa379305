//! Actor identifiers and the fixed registry of their counters.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::window::{WindowCounter, DEFAULT_RETENTION_SECS};
use crate::error::{GateError, Result};

/// A named party whose admitted actions are rate-limited independently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Actor(String);

impl Actor {
    /// Create an actor from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The actor's name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Actor {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Actor {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// One window counter per configured actor.
///
/// The actor set is fixed at construction and iterated in configuration order.
#[derive(Debug, Clone)]
pub struct ActorRegistry {
    /// Actors in configuration order
    actors: Vec<Actor>,
    /// Counters keyed by actor
    counters: HashMap<Actor, WindowCounter>,
}

impl ActorRegistry {
    /// Build a registry with the default retention horizon.
    pub fn new<I, A>(actors: I) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<Actor>,
    {
        Self::with_retention(actors, Duration::seconds(DEFAULT_RETENTION_SECS))
    }

    /// Build a registry whose counters prune with `retention`.
    ///
    /// Fails with `InvalidArgument` if the list is empty or names an actor twice.
    pub fn with_retention<I, A>(actors: I, retention: Duration) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<Actor>,
    {
        let actors: Vec<Actor> = actors.into_iter().map(Into::into).collect();
        if actors.is_empty() {
            return Err(GateError::InvalidArgument(
                "actor list must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(actors.len());
        for actor in &actors {
            if !seen.insert(actor) {
                return Err(GateError::InvalidArgument(format!(
                    "duplicate actor: {}",
                    actor
                )));
            }
        }

        let counters = actors
            .iter()
            .map(|a| (a.clone(), WindowCounter::with_retention(retention)))
            .collect();

        debug!(actors = actors.len(), "Actor registry created");

        Ok(Self { actors, counters })
    }

    /// All actors in configuration order.
    pub fn all_actors(&self) -> &[Actor] {
        &self.actors
    }

    /// Whether `actor` is registered.
    pub fn contains(&self, actor: &Actor) -> bool {
        self.counters.contains_key(actor)
    }

    /// The counter for `actor`.
    pub fn counter_for(&self, actor: &Actor) -> Result<&WindowCounter> {
        self.counters
            .get(actor)
            .ok_or_else(|| GateError::UnknownActor(actor.to_string()))
    }

    fn counter_for_mut(&mut self, actor: &Actor) -> Result<&mut WindowCounter> {
        self.counters
            .get_mut(actor)
            .ok_or_else(|| GateError::UnknownActor(actor.to_string()))
    }

    /// Count each actor's events in the trailing `period` ending at `reference_time`.
    pub fn window_counts(
        &self,
        period: Duration,
        reference_time: DateTime<Utc>,
    ) -> Result<HashMap<Actor, usize>> {
        self.actors
            .iter()
            .map(|actor| {
                let count = self.counter_for(actor)?.count_in_window(period, reference_time)?;
                Ok::<_, GateError>((actor.clone(), count))
            })
            .collect()
    }

    /// Record an event for `actor`, pruning its history.
    pub fn record(&mut self, actor: &Actor, time: DateTime<Utc>) -> Result<()> {
        self.counter_for_mut(actor)?.record(time);
        Ok(())
    }

    /// Prune `actor`'s events older than `reference_time - horizon`.
    pub fn prune(
        &mut self,
        actor: &Actor,
        reference_time: DateTime<Utc>,
        horizon: Duration,
    ) -> Result<()> {
        self.counter_for_mut(actor)?.prune(reference_time, horizon);
        Ok(())
    }

    /// Forget `actor`'s events.
    pub fn clear(&mut self, actor: &Actor) -> Result<()> {
        self.counter_for_mut(actor)?.clear();
        Ok(())
    }

    /// Forget every actor's events.
    ///
    /// This is primarily useful for testing.
    pub fn clear_all(&mut self) {
        for counter in self.counters.values_mut() {
            counter.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::window::timestamp_from_secs;

    const T0: i64 = 1_514_764_800;

    fn at(offset: i64) -> DateTime<Utc> {
        timestamp_from_secs(T0 + offset).unwrap()
    }

    fn testers() -> ActorRegistry {
        ActorRegistry::new(["piddles", "puddles", "pyddles"]).unwrap()
    }

    #[test]
    fn test_registry_preserves_configuration_order() {
        let registry = testers();
        let names: Vec<_> = registry.all_actors().iter().map(Actor::as_str).collect();
        assert_eq!(names, vec!["piddles", "puddles", "pyddles"]);
    }

    #[test]
    fn test_empty_actor_list_is_rejected() {
        let result = ActorRegistry::new(Vec::<String>::new());
        assert!(matches!(result, Err(GateError::InvalidArgument(_))));
    }

    #[test]
    fn test_duplicate_actor_is_rejected() {
        let result = ActorRegistry::new(["piddles", "puddles", "piddles"]);
        assert!(matches!(result, Err(GateError::InvalidArgument(_))));
    }

    #[test]
    fn test_unknown_actor() {
        let mut registry = testers();
        let stranger = Actor::from("paddles");

        assert!(!registry.contains(&stranger));
        assert!(matches!(
            registry.counter_for(&stranger),
            Err(GateError::UnknownActor(name)) if name == "paddles"
        ));
        assert!(matches!(
            registry.record(&stranger, at(0)),
            Err(GateError::UnknownActor(_))
        ));
    }

    #[test]
    fn test_window_counts_per_actor() {
        let mut registry = testers();
        let piddles = Actor::from("piddles");
        let puddles = Actor::from("puddles");

        registry.record(&piddles, at(0)).unwrap();
        registry.record(&piddles, at(60)).unwrap();
        registry.record(&puddles, at(60)).unwrap();

        let counts = registry.window_counts(Duration::minutes(5), at(120)).unwrap();
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[&piddles], 2);
        assert_eq!(counts[&puddles], 1);
        assert_eq!(counts[&Actor::from("pyddles")], 0);
    }

    #[test]
    fn test_keyed_prune_and_clear() {
        let mut registry = testers();
        let piddles = Actor::from("piddles");
        let puddles = Actor::from("puddles");

        registry.record(&piddles, at(0)).unwrap();
        registry.record(&piddles, at(100)).unwrap();
        registry.record(&puddles, at(0)).unwrap();

        registry.prune(&piddles, at(100), Duration::seconds(50)).unwrap();
        assert_eq!(registry.counter_for(&piddles).unwrap().len(), 1);

        registry.clear(&piddles).unwrap();
        assert!(registry.counter_for(&piddles).unwrap().is_empty());
        assert_eq!(registry.counter_for(&puddles).unwrap().len(), 1);

        registry.clear_all();
        assert!(registry.counter_for(&puddles).unwrap().is_empty());
    }
}
