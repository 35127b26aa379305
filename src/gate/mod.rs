//! Admission control: per-actor window counters and the policies built on them.

mod engine;
mod policy;
mod registry;
mod window;

pub use engine::Gate;
pub use policy::{AdmissionPolicy, Limits, MultiActorPolicy, SharedRegistry, SingleActorPolicy};
pub use registry::{Actor, ActorRegistry};
pub use window::{timestamp_from_secs, WindowCounter, DEFAULT_RETENTION_SECS};
