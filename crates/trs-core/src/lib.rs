//! Core types and the identity-matching engine for the teacher record system.
//!
//! This crate is deliberately free of HTTP and database dependencies. Every
//! operation is a synchronous function of its inputs except [`pipeline`],
//! which drives a [`store::CandidateStore`] supplied by the caller.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod attribute;
pub mod clock;
pub mod error;
pub mod intake;
pub mod one_login;
pub mod outbox;
pub mod person;
pub mod pipeline;
pub mod ranking;
pub mod reference;
pub mod resolution;
pub mod review;
pub mod scoring;
pub mod store;
pub mod threshold;

pub use error::{Error, Result};
