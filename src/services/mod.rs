pub mod editor;
pub mod list_service;
pub mod notifier;

pub use editor::{CommitAction, EditorState, ItemEditor};
pub use list_service::{BulkReport, TodoListService};
pub use notifier::{NOTICE_TTL, Notifier};
