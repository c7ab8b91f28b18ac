pub mod filter;
pub mod todo;

pub use filter::FilterMode;
pub use todo::{NewTodoRequest, PLACEHOLDER_ID, Todo};
