use crate::models::Todo;
use crate::services::list_service::TodoListService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Viewing,
    Editing,
    /// A rename was sent and has not settled yet.
    Saving,
    /// The commit emptied the title and a delete was sent.
    Deleting,
    /// The delete succeeded; the todo is gone.
    Removed,
}

/// What the caller must do after [`ItemEditor::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitAction {
    Close,
    Delete(i64),
    Rename { todo: Todo, title: String },
}

/// Inline title editing for a single todo.
#[derive(Debug, Clone)]
pub struct ItemEditor {
    todo: Todo,
    buffer: String,
    state: EditorState,
}

impl ItemEditor {
    pub fn new(todo: Todo) -> Self {
        Self {
            buffer: todo.title.clone(),
            todo,
            state: EditorState::Viewing,
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(
            self.state,
            EditorState::Editing | EditorState::Saving | EditorState::Deleting
        )
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn display_title(&self) -> &str {
        self.buffer.trim()
    }

    /// Double-activation of the title.
    pub fn begin(&mut self) {
        if self.state == EditorState::Viewing {
            self.state = EditorState::Editing;
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        if self.is_editing() {
            self.buffer = text.into();
        }
    }

    /// Escape: revert the buffer and stop editing. A rename already in
    /// flight is not cancelled; its result only stops affecting this editor.
    pub fn cancel(&mut self) {
        if self.state == EditorState::Removed {
            return;
        }
        self.buffer = self.todo.title.clone();
        self.state = EditorState::Viewing;
    }

    /// Follows the authoritative copy from the list. Ignored mid-edit so
    /// the user's text is not clobbered.
    pub fn sync(&mut self, todo: &Todo) {
        if todo.id != self.todo.id {
            return;
        }
        self.todo = todo.clone();
        if self.state == EditorState::Viewing {
            self.buffer = todo.title.clone();
        }
    }

    pub fn commit(&mut self) -> CommitAction {
        if self.state != EditorState::Editing {
            return CommitAction::Close;
        }

        let title = self.buffer.trim();
        if title == self.todo.title {
            self.state = EditorState::Viewing;
            return CommitAction::Close;
        }
        if title.is_empty() {
            self.state = EditorState::Deleting;
            return CommitAction::Delete(self.todo.id);
        }

        let title = title.to_string();
        self.state = EditorState::Saving;
        CommitAction::Rename {
            todo: self.todo.clone(),
            title,
        }
    }

    /// Applies the rename result. Only meaningful while saving: a failure
    /// keeps the editor open for retry.
    pub fn settle(&mut self, renamed: bool) {
        if self.state != EditorState::Saving {
            return;
        }
        if renamed {
            self.todo.title = self.buffer.trim().to_string();
            self.buffer = self.todo.title.clone();
            self.state = EditorState::Viewing;
        } else {
            self.state = EditorState::Editing;
        }
    }

    /// Applies the delete result. A successful delete removes the todo even
    /// if the edit was cancelled meanwhile; a failure reopens the editor so
    /// the user can retry or press Escape.
    pub fn settle_delete(&mut self, deleted: bool) {
        if deleted {
            self.state = EditorState::Removed;
        } else if self.state == EditorState::Deleting {
            self.state = EditorState::Editing;
        }
    }

    /// Commits and drives the resulting remote call to completion.
    pub async fn submit(&mut self, service: &TodoListService) -> EditorState {
        match self.commit() {
            CommitAction::Close => {}
            CommitAction::Delete(id) => {
                let deleted = service.delete(id).await;
                self.settle_delete(deleted);
            }
            CommitAction::Rename { todo, title } => {
                let renamed = service.rename(&todo, &title).await;
                self.settle(renamed);
                if let Some(latest) = service.find(todo.id) {
                    self.sync(&latest);
                }
            }
        }
        self.state
    }
}
