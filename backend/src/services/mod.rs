//! Module for services that talk to external collaborators.
//!
//! Currently this is the media host used to store user avatars and cover
//! images.

pub mod media_service;
