//! Marketplace workflows used by the HTTP routes and the seed command.
//!
//! ARCHITECTURE
//! ============
//! Service modules own validation, pricing and review reconciliation so
//! route handlers can stay focused on protocol translation and auth
//! plumbing. They talk to the backend only through the traits in
//! [`crate::backend`] and take "today" as an argument wherever a rule
//! depends on the calendar.

pub mod auth;
pub mod booking;
pub mod listing;
pub mod pricing;
pub mod review;
pub mod seed;
