//! Shared building blocks for the HTTP API.
//!
//! Authentication routes live in `auth`; this module holds the response
//! envelope and error conversion they use.

pub mod common;
