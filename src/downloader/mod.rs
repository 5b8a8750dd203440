//! Acquisition pipeline: workspaces, fallback execution, artifact lookup

pub mod fallback;
pub mod locator;
pub mod orchestrator;
pub mod workspace;

pub use fallback::{Execution, FallbackExecutor};
pub use locator::{locate, is_partial, LocateWarning, Located, ResolvedArtifact};
pub use orchestrator::{Acquisition, Orchestrator};
pub use workspace::{Workspace, WorkspaceManager};
