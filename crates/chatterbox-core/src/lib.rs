//! # Chatterbox Core
//!
//! Shared logic for Chatterbox: per-chat corpus accumulation, the order-2
//! Markov model, the retrain policy, response selection, message
//! generation, and the snapshot/store abstraction.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. Everything here is deterministic given an
//! injected `rand::Rng`, which is what makes the selection and
//! generation paths testable.

pub mod corpus;
pub mod engine;
pub mod generate;
pub mod markov;
pub mod policy;
pub mod snapshot;
pub mod store;
pub mod theme;
pub mod trainer;

pub use corpus::ChatCorpus;
pub use engine::ChatState;
pub use policy::{AdminAction, ChatPolicy, Mood};
pub use snapshot::ChatSnapshot;
pub use store::{ChatStore, InMemoryStore};
pub use trainer::TrainedModel;
