//! Session mirroring.
//!
//! This module provides the frontend view of a debug session: its
//! identifier and flags, the state mirror built from remote projectors, the
//! tab lifecycle, the facade handed to UI code and a registry of sessions.

mod editors;
mod evaluator;
mod facade;
mod id;
mod mirror;
mod position;
mod registry;
mod state;
mod tab;

pub use editors::EditorsProvider;
pub use evaluator::{EvaluatorProjection, FrontendEvaluator};
pub use facade::{
    FrontendSession, Project, SessionOptions, SessionProxy, SessionServices, DEFAULT_JOIN_TIMEOUT,
};
pub use id::SessionId;
pub use mirror::SessionStateMirror;
pub use position::{SourcePosition, SourcePositionProjection};
pub use registry::SessionRegistry;
pub use state::{SessionSnapshot, TabState};
