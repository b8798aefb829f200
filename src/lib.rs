//! Planboard collaboration core
//!
//! Users create tasks and assign them to others, host events and invite
//! guests, and receive notifications as these records change state over
//! time. This crate holds the entity store, the status/notification
//! reconciliation engine, and the periodic batch sweeper.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod reconcile;
pub mod sweep;
pub mod types;
