use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::api::TodoApi;
use crate::error::{AppError, Notice};
use crate::models::{FilterMode, Todo};
use crate::services::notifier::Notifier;
use crate::state::{CreateOutcome, CreateState, ListState, TodoView};

/// Outcome of a fan-out operation, partitioned by id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BulkReport {
    pub succeeded: Vec<i64>,
    pub failed: Vec<i64>,
}

struct Batch<T> {
    succeeded: Vec<(i64, T)>,
    failed: Vec<i64>,
}

/// Owns the todo list and mediates every mutation against the remote API.
///
/// The service is cheap to clone; clones share state. Each operation marks
/// the affected ids pending, awaits the remote call without holding the
/// state lock, then applies the settled result. Failures never escape: they
/// become a [`Notice`] on the shared [`Notifier`].
#[derive(Clone)]
pub struct TodoListService {
    api: Arc<dyn TodoApi>,
    state: Arc<Mutex<ListState>>,
    notifier: Notifier,
}

impl TodoListService {
    pub fn new(api: Arc<dyn TodoApi>, notifier: Notifier) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(ListState::default())),
            notifier,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fail(&self, notice: Notice, err: &AppError) {
        warn!("{}: {}", notice, err);
        self.notifier.notify(notice);
    }

    pub fn dismiss_notice(&self) {
        self.notifier.dismiss();
    }

    pub fn view(&self) -> TodoView {
        let notice = self.notifier.current();
        self.lock().view(notice)
    }

    pub fn todos(&self) -> Vec<Todo> {
        self.lock().todos.clone()
    }

    pub fn find(&self, id: i64) -> Option<Todo> {
        self.lock().find(id).cloned()
    }

    pub fn create_state(&self) -> CreateState {
        self.lock().create.clone()
    }

    pub fn is_pending(&self, id: i64) -> bool {
        self.lock().is_pending(id)
    }

    pub fn set_filter(&self, filter: FilterMode) {
        self.lock().filter = filter;
    }

    /// Fetches the owner's list. On failure the list is left as it was.
    pub async fn load(&self) -> bool {
        match self.api.list().await {
            Ok(todos) => {
                info!("loaded {} todos", todos.len());
                self.lock().replace_all(todos);
                true
            }
            Err(e) => {
                self.fail(Notice::LoadError, &e);
                false
            }
        }
    }

    /// Creates a todo, showing a placeholder while the request is in flight.
    /// Returns whether a todo was created.
    pub async fn create(&self, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            self.notifier.notify(Notice::EmptyTitle);
            return false;
        }

        {
            let mut state = self.lock();
            if state.create.is_pending() {
                warn!("create ignored, another create is still in flight");
                return false;
            }
            state.create = CreateState::Pending(Todo::placeholder(title, self.api.user_id()));
        }

        match self.api.create(title).await {
            Ok(todo) => {
                info!("created todo {}", todo.id);
                let mut state = self.lock();
                state.create = CreateState::Settled(CreateOutcome::Created(todo.id));
                state.append(todo);
                true
            }
            Err(e) => {
                self.lock().create = CreateState::Settled(CreateOutcome::Failed);
                self.fail(Notice::AddError, &e);
                false
            }
        }
    }

    pub async fn delete(&self, id: i64) -> bool {
        self.lock().mark_pending(id);

        let result = self.api.delete(id).await;

        let mut state = self.lock();
        state.clear_pending(id);
        match result {
            Ok(()) => {
                state.remove(id);
                true
            }
            Err(e) => {
                drop(state);
                self.fail(Notice::DeleteError, &e);
                false
            }
        }
    }

    /// Flips `completed` and adopts the server's copy of the todo.
    pub async fn toggle(&self, todo: &Todo) -> bool {
        let flipped = todo.with_completed(!todo.completed);
        self.update(flipped).await
    }

    /// Renames a todo. An unchanged title is a successful no-op and an empty
    /// one deletes the todo instead. A `false` result means the caller should
    /// stay in edit mode.
    pub async fn rename(&self, todo: &Todo, new_title: &str) -> bool {
        let title = new_title.trim();
        if title == todo.title {
            return true;
        }
        if title.is_empty() {
            return self.delete(todo.id).await;
        }
        self.update(todo.with_title(title)).await
    }

    async fn update(&self, changed: Todo) -> bool {
        let id = changed.id;
        let generation = {
            let mut state = self.lock();
            state.mark_pending(id);
            state.next_generation(id)
        };

        let result = self.api.update(&changed).await;

        let mut state = self.lock();
        state.clear_pending(id);
        match result {
            Ok(updated) => {
                if !state.apply_update(id, updated, generation) {
                    debug!("dropped superseded update for todo {}", id);
                }
                true
            }
            Err(e) => {
                drop(state);
                self.fail(Notice::UpdateError, &e);
                false
            }
        }
    }

    /// Deletes every completed todo concurrently. Successful deletes are
    /// kept even if some siblings fail.
    pub async fn clear_completed(&self) -> BulkReport {
        let targets: Vec<Todo> = {
            let mut state = self.lock();
            let targets: Vec<Todo> = state.todos.iter().filter(|t| t.completed).cloned().collect();
            for todo in &targets {
                state.mark_pending(todo.id);
            }
            targets
        };
        if targets.is_empty() {
            return BulkReport::default();
        }

        let batch = self
            .fan_out(&targets, |api, todo| async move { api.delete(todo.id).await })
            .await;

        {
            let mut state = self.lock();
            for todo in &targets {
                state.clear_pending(todo.id);
            }
            for (id, ()) in &batch.succeeded {
                state.remove(*id);
            }
        }

        info!(
            "cleared {} completed todos, {} failed",
            batch.succeeded.len(),
            batch.failed.len()
        );
        if !batch.failed.is_empty() {
            self.notifier.notify(Notice::DeleteError);
        }

        BulkReport {
            succeeded: batch.succeeded.into_iter().map(|(id, ())| id).collect(),
            failed: batch.failed,
        }
    }

    /// Completes every active todo, or reopens all of them when none is
    /// active. Each successful update adopts the server's copy.
    pub async fn toggle_all(&self) -> BulkReport {
        let (targets, generations) = {
            let mut state = self.lock();
            let all_completed = state.todos.iter().all(|t| t.completed);
            let targets: Vec<Todo> = state
                .todos
                .iter()
                .filter(|t| all_completed || !t.completed)
                .map(|t| t.with_completed(!all_completed))
                .collect();

            let mut generations = HashMap::new();
            for todo in &targets {
                state.mark_pending(todo.id);
                generations.insert(todo.id, state.next_generation(todo.id));
            }
            (targets, generations)
        };
        if targets.is_empty() {
            return BulkReport::default();
        }

        let batch = self
            .fan_out(&targets, |api, todo| async move { api.update(&todo).await })
            .await;

        let mut succeeded = Vec::with_capacity(batch.succeeded.len());
        {
            let mut state = self.lock();
            for todo in &targets {
                state.clear_pending(todo.id);
            }
            for (id, updated) in batch.succeeded {
                let generation = generations.get(&id).copied().unwrap_or_default();
                if !state.apply_update(id, updated, generation) {
                    debug!("dropped stale bulk update for todo {}", id);
                }
                succeeded.push(id);
            }
        }

        if !batch.failed.is_empty() {
            self.notifier.notify(Notice::UpdateError);
        }

        BulkReport {
            succeeded,
            failed: batch.failed,
        }
    }

    /// Launches one task per todo, joins them all, and partitions by outcome.
    async fn fan_out<T, F, Fut>(&self, todos: &[Todo], op: F) -> Batch<T>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn TodoApi>, Todo) -> Fut,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let mut tasks = JoinSet::new();
        for todo in todos {
            let id = todo.id;
            let call = op(self.api.clone(), todo.clone());
            tasks.spawn(async move { (id, call.await) });
        }

        let mut batch = Batch {
            succeeded: Vec::new(),
            failed: Vec::new(),
        };
        let mut settled = HashSet::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(value))) => {
                    settled.insert(id);
                    batch.succeeded.push((id, value));
                }
                Ok((id, Err(e))) => {
                    warn!("bulk operation failed for todo {}: {}", id, e);
                    settled.insert(id);
                    batch.failed.push(id);
                }
                Err(e) => warn!("bulk task did not complete: {}", e),
            }
        }

        // tasks that panicked never reported their id
        for todo in todos {
            if !settled.contains(&todo.id) {
                batch.failed.push(todo.id);
            }
        }
        batch
    }
}
