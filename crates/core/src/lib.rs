//! Domain logic and storage for the 40Weeks pregnancy tracker.
//!
//! Handlers in the API crate call the service modules here (`pregnancy`,
//! `village`, `access`, `updates`, `progress`, `timeline`); those in turn
//! use the repositories in [`store`].

pub mod access;
pub mod auth;
pub mod error;
pub mod events;
pub mod invite;
pub mod mail;
pub mod media;
pub mod milestones;
pub mod models;
pub mod pregnancy;
pub mod progress;
pub mod store;
pub mod timeline;
pub mod updates;
pub mod validate;
pub mod village;
pub mod week;

pub use error::{CoreError, CoreResult};
