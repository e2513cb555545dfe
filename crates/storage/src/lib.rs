//! SQLite-backed journal for Armory chat sessions.
//!
//! Every turn a client runs can be recorded here: the user's message, the
//! model's final answer, or the tool call it dispatched and what the tool
//! returned. The journal is append-only and queried per session.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use storage::{Event, EventKind, EventStore, Role, SessionId};
//!
//! let store = EventStore::open("journal.db")?;
//! let session = SessionId::new();
//!
//! store.append(&Event::new(session, EventKind::SessionStart))?;
//! store.append(&Event::message(session, Role::User, "search for x"))?;
//! store.append(&Event::tool_call(session, "web", "search", json!({"q": "x"})))?;
//! store.append(&Event::tool_result(session, "search", json!("result-y")))?;
//!
//! for event in store.load_session(session)? {
//!     println!("{}: {:?}", event.timestamp, event.kind);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod event;
mod store;

pub use error::{Error, Result};
pub use event::{Event, EventKind, Role, SessionId};
pub use store::{EventStore, SessionSummary};
