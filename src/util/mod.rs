//! Caller-side helpers.

pub mod retry;
