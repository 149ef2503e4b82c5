//! Yeaye combat engine
//!
//! Turn-based card battles: live card instances with derived stats, a
//! declarative tag-rule engine, simultaneous action planning with conflict
//! resolution, and target selection including asynchronous manual picks.

pub mod config;
pub mod core;
pub mod error;
pub mod game;
pub mod loader;
pub mod rules;

pub use error::{CombatError, Result};
