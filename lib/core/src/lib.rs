//! Core types shared across tollgate crates.
//!
//! This crate provides the `Result` alias used for layered error reporting
//! and the [`Whitelist`] of usernames that are authorized independently of
//! any identity provider's group membership.

pub mod error;
pub mod whitelist;

pub use error::Result;
pub use whitelist::Whitelist;
