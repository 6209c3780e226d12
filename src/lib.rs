//! Kitchen appliance repair marketplace.
//!
//! ARCHITECTURE
//! ============
//! ```text
//! guard     pure navigation decision over (path, AuthSnapshot)
//! auth      client-side session source, AuthStore, GuardDriver
//! backend   hosted backend client (auth + tables) behind traits
//! services  marketplace rules: catalog, bookings, reviews, verification
//! routes    axum pages behind the guard middleware + JSON API
//! ```

pub mod auth;
pub mod backend;
pub mod config;
pub mod guard;
pub mod model;
pub mod routes;
pub mod services;
pub mod state;
