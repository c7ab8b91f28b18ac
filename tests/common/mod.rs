#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use todoapp::api::TodoApi;
use todoapp::error::AppError;
use todoapp::models::Todo;

pub const USER_ID: i64 = 42;

/// Gate key used for create calls, which have no id yet.
pub const CREATE_GATE: i64 = 0;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Create(String),
    Update(Todo),
    Delete(i64),
}

/// In-memory todo collection with failure injection and response gates.
///
/// A gated call applies its effect to the store immediately and then waits
/// for the gate to open before responding, modelling a slow response.
#[derive(Default)]
pub struct ScriptedApi {
    todos: Mutex<Vec<Todo>>,
    next_id: AtomicI64,
    fail_list: AtomicBool,
    fail_create: AtomicBool,
    failing_updates: Mutex<HashSet<i64>>,
    failing_deletes: Mutex<HashSet<i64>>,
    calls: Mutex<Vec<Call>>,
    gates: Mutex<HashMap<i64, VecDeque<Arc<Notify>>>>,
}

pub fn todo(id: i64, completed: bool) -> Todo {
    Todo {
        id,
        title: format!("todo {}", id),
        completed,
        user_id: USER_ID,
    }
}

impl ScriptedApi {
    pub fn with_todos(todos: Vec<Todo>) -> Arc<Self> {
        let next = todos.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let api = Self::default();
        *api.todos.lock().unwrap() = todos;
        api.next_id.store(next, Ordering::SeqCst);
        Arc::new(api)
    }

    pub fn fail_list(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    pub fn fail_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    /// Fails every later update and delete for `id`.
    pub fn fail_id(&self, id: i64) {
        self.fail_update(id);
        self.fail_delete(id);
    }

    pub fn fail_update(&self, id: i64) {
        self.failing_updates.lock().unwrap().insert(id);
    }

    pub fn fail_delete(&self, id: i64) {
        self.failing_deletes.lock().unwrap().insert(id);
    }

    /// Holds the next call for `id` until the returned gate is notified.
    pub fn hold(&self, id: i64) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .entry(id)
            .or_default()
            .push_back(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn update_calls(&self) -> Vec<Todo> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn stored(&self) -> Vec<Todo> {
        self.todos.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn wait_gate(&self, id: i64) {
        let gate = self
            .gates
            .lock()
            .unwrap()
            .get_mut(&id)
            .and_then(|q| q.pop_front());
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

fn scripted_failure() -> AppError {
    AppError::Status {
        status: 500,
        body: "scripted failure".to_string(),
    }
}

#[async_trait]
impl TodoApi for ScriptedApi {
    fn user_id(&self) -> i64 {
        USER_ID
    }

    async fn list(&self) -> Result<Vec<Todo>, AppError> {
        self.record(Call::List);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(scripted_failure());
        }
        Ok(self.stored())
    }

    async fn create(&self, title: &str) -> Result<Todo, AppError> {
        self.record(Call::Create(title.to_string()));
        let result = if self.fail_create.load(Ordering::SeqCst) {
            Err(scripted_failure())
        } else {
            let todo = Todo {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                title: title.to_string(),
                completed: false,
                user_id: USER_ID,
            };
            self.todos.lock().unwrap().push(todo.clone());
            Ok(todo)
        };
        self.wait_gate(CREATE_GATE).await;
        result
    }

    async fn update(&self, todo: &Todo) -> Result<Todo, AppError> {
        self.record(Call::Update(todo.clone()));
        let result = if self.failing_updates.lock().unwrap().contains(&todo.id) {
            Err(scripted_failure())
        } else {
            let mut todos = self.todos.lock().unwrap();
            match todos.iter_mut().find(|t| t.id == todo.id) {
                Some(slot) => {
                    *slot = todo.clone();
                    Ok(slot.clone())
                }
                None => Err(AppError::Status {
                    status: 404,
                    body: "Not Found".to_string(),
                }),
            }
        };
        self.wait_gate(todo.id).await;
        result
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.record(Call::Delete(id));
        let result = if self.failing_deletes.lock().unwrap().contains(&id) {
            Err(scripted_failure())
        } else {
            self.todos.lock().unwrap().retain(|t| t.id != id);
            Ok(())
        };
        self.wait_gate(id).await;
        result
    }
}

/// Yields to the runtime until `cond` holds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
