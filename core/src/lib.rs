//! Typed record client for a Parse-style REST backend.
//!
//! # Overview
//! Maps typed queries, inserts, updates and deletes onto the backend's
//! `/{version}/classes/{Class}` endpoints. Callers work with their own
//! serde types instead of building HTTP requests and parsing JSON by hand.
//!
//! # Design
//! - Record types implement [`Record`] to name their backend class.
//! - Every operation has a pure `build_*` / `parse_*` pair; the blocking
//!   methods on [`RecordClient`] run them through a [`Transport`]
//!   ([`UreqTransport`] by default).
//! - Update and delete report backend-side failures as `Ok(false)`; only
//!   transport and decoding failures are errors.
//!
//! ```no_run
//! use record_core::{ChangeSet, ClientConfig, Record, RecordClient};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct GameScore {
//!     score: u32,
//! }
//!
//! impl Record for GameScore {
//!     const CLASS_NAME: &'static str = "GameScore";
//! }
//!
//! let client = RecordClient::new(ClientConfig::new("app-id", "rest-key"));
//! let id = client.store(&GameScore { score: 1337 })?;
//! let high: Vec<GameScore> = client.query(r#"{"score":{"$gt":1000}}"#)?;
//! client.update::<GameScore>(&id, &ChangeSet::new().set("score", 1338))?;
//! client.delete::<GameScore>(&id)?;
//! # Ok::<(), record_core::ApiError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use client::RecordClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use types::{ChangeSet, Record, RecordReference};
