//! Workload configuration: validation and bounded storage.
//!
//! A config source pushes `(workload id, config)` pairs into the engine.
//! Every candidate passes through [`validate`] before storage, and every read
//! re-validates — a record that somehow stops validating is treated as
//! absent, so corruption degrades to default scheduling rather than a
//! priority escalation.

pub mod store;
pub mod validate;

pub use self::store::ConfigStore;
pub use self::validate::{validate, ConfigError};
