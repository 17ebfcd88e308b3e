//! # Vinylify
//!
//! Adapts raw filesystem change events arriving on a push-based stream into
//! fully-hydrated file records (metadata + contents), suitable for
//! downstream build-pipeline consumption.
//!
//! ## Features
//!
//! - **Whitelist filtering** of event kinds, with `all` expansion and a
//!   dynamic option-bag entry point that validates its shape
//! - **Ref-counted multicast split** so one upstream subscription serves
//!   both the removal branch and the enrichment branch
//! - **Blocking or deferred enrichment**, selected once at construction
//! - **`since` cutoff** dropping items whose mtime does not postdate it
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌────────────┐   ┌───────────┐   ┌──────────────────────────────┐
//! │ RawEvent   │──▶│ Whitelist │──▶│ SharedSource (refcount fan-out)│
//! │ stream     │   │ filter    │   └──────┬──────────────┬────────┘
//! └────────────┘   └───────────┘          │              │
//!                              unlink/unlinkDir   add/change/addDir
//!                                         │              │
//!                                  ┌──────▼─────┐ ┌──────▼───────────┐
//!                                  │ bare record│ │ stat → since →   │
//!                                  │ (no stat)  │ │ read (FsBackend) │
//!                                  └──────┬─────┘ └──────┬───────────┘
//!                                         └──────┬───────┘
//!                                           merged FileRecord stream
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use vinylify::{EventKind, RawEvent, VinylifyConfig, VinylifyExt};
//!
//! #[tokio::main]
//! async fn main() {
//!     let events = futures::stream::iter(vec![
//!         RawEvent::new(EventKind::Add, "notes/todo.md"),
//!         RawEvent::new(EventKind::Unlink, "notes/old.md"),
//!     ]);
//!
//!     let mut records = events.vinylify(VinylifyConfig::default());
//!     while let Some(record) = records.next().await {
//!         match record {
//!             Ok(file) => println!("{}", file.path.display()),
//!             Err(err) => eprintln!("pipeline failed: {err}"),
//!         }
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod backends;
mod config;
pub mod error;
mod events;
mod pipeline;
mod record;
mod share;
mod whitelist;

pub use config::{ReadOptions, StatOptions, VinylifyConfig};
pub use error::{Error, Result};
pub use events::{EventKind, RawEvent};
pub use pipeline::{vinylify, VinylStream, VinylifyExt};
pub use record::{FileContents, FileMetadata, FileRecord};
pub use share::{SharedSource, SharedSubscription};
pub use whitelist::{EventFilterSource, Whitelist};

/// Re-export of common types for convenience.
pub mod prelude {
    pub use crate::{
        vinylify, Error, EventFilterSource, EventKind, FileContents, FileMetadata, FileRecord,
        RawEvent, Result, VinylStream, VinylifyConfig, VinylifyExt, Whitelist,
    };
}
