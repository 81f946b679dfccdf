//! Application-facing orchestration services.
//!
//! # Responsibility
//! - Wire the vault, reminder and history stores into use-case level APIs.
//! - Keep UI layers decoupled from storage and crypto details.

pub mod workspace;

pub use workspace::{Workspace, WorkspaceError};
