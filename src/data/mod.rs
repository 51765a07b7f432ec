//! Persistence of acquisition sessions.

pub mod storage;

pub use storage::{default_export_path, save_session, write_session};
