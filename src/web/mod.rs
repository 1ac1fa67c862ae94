//! Web presentation layer.
//!
//! Public pages, the admin back office and the driver self-service portal,
//! all served from one axum router. Handlers are total: stores degrade to
//! empty, missing entities redirect with a notice, and provider failures
//! render as missing stats rather than error pages.

mod admin;
mod auth;
mod pages;
mod portal;
mod public;
mod server;
mod uploads;

pub use auth::{create_session_store, Principal, SharedSessionStore};
pub use server::{build_router, start_web_server, AppState};
