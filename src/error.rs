use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Todos API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// User-facing error banner kinds. Every failed action ends up as one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    LoadError,
    EmptyTitle,
    AddError,
    DeleteError,
    UpdateError,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Notice::LoadError => "Unable to load todos",
            Notice::EmptyTitle => "Title should not be empty",
            Notice::AddError => "Unable to add a todo",
            Notice::DeleteError => "Unable to delete a todo",
            Notice::UpdateError => "Unable to update a todo",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
