use serde::{Deserialize, Serialize};

/// Id carried by the local placeholder while a create request is in flight.
pub const PLACEHOLDER_ID: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub completed: bool,
    pub user_id: i64,
}

impl Todo {
    pub fn placeholder(title: &str, user_id: i64) -> Self {
        Self {
            id: PLACEHOLDER_ID,
            title: title.to_string(),
            completed: false,
            user_id,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id == PLACEHOLDER_ID
    }

    pub fn with_completed(&self, completed: bool) -> Self {
        Self {
            completed,
            ..self.clone()
        }
    }

    pub fn with_title(&self, title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodoRequest {
    pub title: String,
    pub user_id: i64,
    pub completed: bool,
}
