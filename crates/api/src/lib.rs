//! Image generation API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! reconciliation) so integration tests and the binary entrypoint can both
//! access them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod reconcile;
pub mod router;
pub mod routes;
pub mod state;
