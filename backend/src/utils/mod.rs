//! Collection of general utility modules.
//!
//! Token signing and password hashing, used by the authentication service.

pub mod jwt;
pub mod password;
