//! RuyiSDK backend - release mirroring worker.
//!
//! Mirrors the newest GitHub releases of the Ruyi package manager into a
//! local staging tree and pushes them to the rsync distribution mirror.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod release;
pub mod staging;
pub mod sync;
pub mod transport;

pub use error::{Result, SyncError};
