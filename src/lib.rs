//! # debug-mirror
//!
//! Frontend-side mirror of remote debugger sessions.
//!
//! A backend publishes session state as independent streams of snapshots
//! (evaluator, source position, flags, tab descriptors). This crate turns
//! them into a local, non-blocking session facade: each stream feeds a
//! latest-value projector that materializes at most one live object per
//! stream, the session tab is built exactly once on the UI context, and
//! closing the session tears every subscription down.
//!
//! ## Features
//!
//! - **Latest-value projection**: stale snapshots are skipped, superseded
//!   objects are disposed before their successors become current
//! - **Scoped lifetimes**: one cancellation tree per session, joined on shutdown
//! - **UI marshaling**: tab construction and pause callbacks run on one thread
//! - **In-memory backend**: channel-backed remote for tests and replay
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use debug_mirror::scenario::LoggingTabs;
//! use debug_mirror::{
//!     FrontendSession, InMemoryBackend, Project, Scope, SessionDto, SessionId, SessionOptions,
//!     SessionServices, UiThread,
//! };
//!
//! #[tokio::main]
//! async fn main() -> debug_mirror::Result<()> {
//!     debug_mirror::logging::try_init().ok();
//!
//!     let backend = Arc::new(InMemoryBackend::new());
//!     let services = SessionServices {
//!         remote: backend.clone(),
//!         evaluation: backend.clone(),
//!         tabs: Arc::new(LoggingTabs),
//!         ui: Arc::new(UiThread::spawn("ui")?),
//!     };
//!
//!     let dto = SessionDto::new(SessionId::new(), "main", "Rust");
//!     let session = FrontendSession::open(
//!         Project::new("demo"),
//!         &Scope::root("app"),
//!         dto,
//!         services,
//!         SessionOptions::default(),
//!     );
//!
//!     println!("paused: {}", session.is_paused());
//!     session.shutdown().await
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod projector;
pub mod remote;
pub mod scenario;
pub mod scope;
pub mod session;
pub mod ui;

// Re-export commonly used types
pub use error::{MirrorError, Result};
pub use projector::{PassThrough, Projection, Projector};
pub use remote::{
    EvaluationBackend, InMemoryBackend, PausedEvent, RemoteSessionSource, SessionDto, TabInfo,
};
pub use scope::Scope;
pub use session::{
    FrontendEvaluator, FrontendSession, Project, SessionId, SessionOptions, SessionProxy,
    SessionRegistry, SessionServices, SessionSnapshot, SourcePosition, TabState,
};
pub use ui::{DebugTab, TabFactory, UiDispatcher, UiThread};
