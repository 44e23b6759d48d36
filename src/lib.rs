//! Ceptra: the orchestration core of an editor-embedded coding assistant.
//!
//! A user message goes to a chat gateway together with a snapshot of the
//! workspace and a window of recent conversation. The reply may embed fenced
//! `run`, `read`, and `write` blocks; reads are served immediately, while
//! runs and writes wait behind an approval gate. Approving the lead command
//! of a reply feeds its output back to the model for analysis.
//!
//! # Quick start
//!
//! ```no_run
//! use ceptra::agent::Orchestrator;
//! use ceptra::config::load_config;
//! use ceptra::host::LocalHost;
//! use ceptra::session::SessionContext;
//! use ceptra::workspace::ProjectInspector;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = load_config(None).unwrap();
//! let inspector = ProjectInspector::new(std::env::current_dir().ok());
//! let mut orchestrator = Orchestrator::new(
//!     &config,
//!     SessionContext::start(None),
//!     Arc::new(LocalHost::default()),
//!     Arc::new(inspector),
//! );
//! orchestrator.send("What does this project build?").await.unwrap();
//! for pending in orchestrator.pending() {
//!     println!("awaiting approval: {}", pending.id);
//! }
//! # }
//! ```

pub mod agent;
pub mod auth;
pub mod build_info;
pub mod config;
pub mod error;
pub mod gate;
pub mod gateway;
pub mod history;
pub mod host;
pub mod logging;
pub mod parser;
pub mod render;
pub mod repl;
pub mod runtime;
pub mod session;
#[cfg(test)]
pub mod testsupport;
pub mod textutil;
pub mod types;
pub mod workspace;
