//! Authentication module for user accounts and sessions.
//!
//! This module provides registration, login, logout and refresh-token
//! rotation, the cookie plumbing that delivers tokens, and the access-token
//! middleware guarding authenticated routes.

pub mod cookies;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;
