mod history;
mod workspace;

pub use history::{History, DEFAULT_MAX_UNDO};
pub use workspace::Workspace;
