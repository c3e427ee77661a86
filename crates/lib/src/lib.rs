//! Mira core library — Markdown rendering, schema-driven settings forms,
//! configuration, and session storage used by the desktop application.

pub mod backend;
pub mod config;
pub mod form;
pub mod init;
pub mod markdown;
pub mod schema;
pub mod session;
