//! EduPortal: a role-based client for the education platform.
//!
//! The binary in `main.rs` is a thin shell over [`app::Portal`]; everything
//! it does is reachable from here so tests can drive the same flows.

pub mod app;
pub mod config;
pub mod guard;
pub mod net;
pub mod pages;
pub mod routes;
pub mod session;
