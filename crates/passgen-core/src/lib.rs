//! passgen core - password generation and the record store
//!
//! Two pieces do the real work:
//! - `generator` turns a [`Policy`] and a [`Length`] into a random string
//! - `store` keeps label -> [`Record`] in a JSON file, saved after every change
//!
//! Everything else (paths, config) is plumbing for the `passgen` binary.

pub mod config;
pub mod generator;
pub mod paths;
pub mod policy;
pub mod store;

pub use config::{Config, ConfigError};
pub use generator::{generate, generate_with};
pub use paths::Paths;
pub use policy::{Length, LengthError, Policy, PolicyError};
pub use store::{Record, RecordStore, StoreError};
