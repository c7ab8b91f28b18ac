use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::Notice;
use crate::models::{FilterMode, Todo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(i64),
    Failed,
}

/// Lifecycle of the "todo being created" placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CreateState {
    #[default]
    Idle,
    Pending(Todo),
    Settled(CreateOutcome),
}

impl CreateState {
    pub fn placeholder(&self) -> Option<&Todo> {
        match self {
            CreateState::Pending(todo) => Some(todo),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, CreateState::Pending(_))
    }
}

/// Canonical client-side state. Only the list service mutates it.
#[derive(Debug, Default)]
pub struct ListState {
    pub todos: Vec<Todo>,
    pub filter: FilterMode,
    pub create: CreateState,
    pending: HashMap<i64, usize>,
    generations: HashMap<i64, u64>,
    /// Newest generation whose successful response has been applied.
    applied: HashMap<i64, u64>,
    deleted: HashSet<i64>,
}

impl ListState {
    pub fn mark_pending(&mut self, id: i64) {
        *self.pending.entry(id).or_insert(0) += 1;
    }

    pub fn clear_pending(&mut self, id: i64) {
        if let Some(count) = self.pending.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(&id);
            }
        }
    }

    pub fn is_pending(&self, id: i64) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending_ids(&self) -> BTreeSet<i64> {
        self.pending.keys().copied().collect()
    }

    /// Takes a new update ticket for `id`. Tickets are issued in request
    /// order.
    pub fn next_generation(&mut self, id: i64) -> u64 {
        let generation = self.generations.entry(id).or_insert(0);
        *generation += 1;
        *generation
    }

    /// Whether a successful response for `generation` may still be applied:
    /// no response to a later request for `id` has been applied yet. Failed
    /// requests never advance this, so they cannot mask an older success.
    pub fn is_current(&self, id: i64, generation: u64) -> bool {
        generation > self.applied.get(&id).copied().unwrap_or(0)
    }

    /// Replaces the entry with the server copy unless a newer request's
    /// response already landed. Never inserts. Returns whether it was applied.
    pub fn apply_update(&mut self, id: i64, updated: Todo, generation: u64) -> bool {
        if self.deleted.contains(&id) || !self.is_current(id, generation) {
            return false;
        }
        match self.todos.iter_mut().find(|t| t.id == id) {
            Some(slot) => {
                *slot = updated;
                self.applied.insert(id, generation);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: i64) {
        self.deleted.insert(id);
        self.todos.retain(|t| t.id != id);
    }

    pub fn append(&mut self, todo: Todo) {
        self.deleted.remove(&todo.id);
        self.todos.push(todo);
    }

    pub fn replace_all(&mut self, todos: Vec<Todo>) {
        self.todos = todos;
    }

    pub fn find(&self, id: i64) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn view(&self, notice: Option<Notice>) -> TodoView {
        let active_count = self.todos.iter().filter(|t| !t.completed).count();
        let completed_count = self.todos.len() - active_count;

        TodoView {
            filter: self.filter,
            visible: self.filter.apply(&self.todos),
            placeholder: self.create.placeholder().cloned(),
            pending: self.pending_ids(),
            notice,
            creating: self.create.is_pending(),
            active_count,
            all_completed: active_count == 0,
            has_todos: !self.todos.is_empty(),
            can_clear_completed: completed_count > 0,
        }
    }
}

/// Render-ready snapshot of the list.
#[derive(Debug, Clone, PartialEq)]
pub struct TodoView {
    pub filter: FilterMode,
    pub visible: Vec<Todo>,
    pub placeholder: Option<Todo>,
    pub pending: BTreeSet<i64>,
    pub notice: Option<Notice>,
    /// New-todo input is disabled while set.
    pub creating: bool,
    pub active_count: usize,
    pub all_completed: bool,
    pub has_todos: bool,
    pub can_clear_completed: bool,
}

impl TodoView {
    pub fn items_left_label(&self) -> String {
        let noun = if self.active_count == 1 { "item" } else { "items" };
        format!("{} {} left", self.active_count, noun)
    }

    pub fn show_toggle_all(&self) -> bool {
        self.has_todos
    }

    pub fn show_footer(&self) -> bool {
        self.has_todos
    }

    pub fn is_busy(&self, id: i64) -> bool {
        self.pending.contains(&id)
    }
}
