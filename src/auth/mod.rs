//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Google OAuth / OpenID Connect login handshake
//! - One-time exchange codes for handing the session token to the frontend
//! - AuthedUser extractor for protected routes

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod login;
pub mod models;
pub mod routes;
pub mod validators;


pub use routes::auth_routes;
