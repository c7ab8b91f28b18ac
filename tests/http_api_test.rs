use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;

use todoapp::api::{ApiConfig, HttpTodoApi, TodoApi};
use todoapp::error::AppError;
use todoapp::models::{NewTodoRequest, Todo};

const USER_ID: i64 = 7;

#[derive(Default)]
struct FakeCollection {
    todos: Vec<Todo>,
    next_id: i64,
}

type Shared = Arc<Mutex<FakeCollection>>;

#[derive(Deserialize)]
struct OwnerQuery {
    #[serde(rename = "userId")]
    user_id: i64,
}

async fn list_todos(
    State(db): State<Shared>,
    Query(q): Query<OwnerQuery>,
) -> Json<Vec<Todo>> {
    let db = db.lock().unwrap();
    Json(db.todos.iter().filter(|t| t.user_id == q.user_id).cloned().collect())
}

async fn create_todo(
    State(db): State<Shared>,
    Json(req): Json<NewTodoRequest>,
) -> (StatusCode, Json<Todo>) {
    let mut db = db.lock().unwrap();
    db.next_id += 1;
    let todo = Todo {
        id: db.next_id,
        title: req.title,
        completed: req.completed,
        user_id: req.user_id,
    };
    db.todos.push(todo.clone());
    (StatusCode::CREATED, Json(todo))
}

async fn update_todo(
    State(db): State<Shared>,
    Path(id): Path<i64>,
    Json(req): Json<Todo>,
) -> Result<Json<Todo>, StatusCode> {
    let mut db = db.lock().unwrap();
    let slot = db.todos.iter_mut().find(|t| t.id == id).ok_or(StatusCode::NOT_FOUND)?;
    slot.title = req.title;
    slot.completed = req.completed;
    Ok(Json(slot.clone()))
}

async fn delete_todo(
    State(db): State<Shared>,
    Path(id): Path<i64>,
) -> Result<&'static str, StatusCode> {
    let mut db = db.lock().unwrap();
    let before = db.todos.len();
    db.todos.retain(|t| t.id != id);
    if db.todos.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok("1")
}

async fn broken_list() -> &'static str {
    "<html>not json</html>"
}

async fn serve(seed: Vec<Todo>) -> (SocketAddr, Shared) {
    let next_id = seed.iter().map(|t| t.id).max().unwrap_or(0);
    let db: Shared = Arc::new(Mutex::new(FakeCollection { todos: seed, next_id }));

    let app = Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}", patch(update_todo).delete(delete_todo))
        .route("/broken/todos", get(broken_list))
        .with_state(db.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, db)
}

fn client(addr: SocketAddr, path: &str) -> HttpTodoApi {
    let config = ApiConfig::new(format!("http://{}{}", addr, path), USER_ID);
    HttpTodoApi::new(config).unwrap()
}

fn todo(id: i64, user_id: i64) -> Todo {
    Todo {
        id,
        title: format!("todo {}", id),
        completed: false,
        user_id,
    }
}

#[tokio::test]
async fn list_is_scoped_to_owner() {
    let (addr, _db) = serve(vec![todo(1, USER_ID), todo(2, 99), todo(3, USER_ID)]).await;
    let api = client(addr, "/");

    let todos = api.list().await.unwrap();
    assert_eq!(todos, vec![todo(1, USER_ID), todo(3, USER_ID)]);
}

#[tokio::test]
async fn create_sends_owner_and_returns_assigned_id() {
    let (addr, db) = serve(vec![todo(4, USER_ID)]).await;
    let api = client(addr, "");

    let created = api.create("water plants").await.unwrap();

    assert_eq!(created.id, 5);
    assert_eq!(created.title, "water plants");
    assert!(!created.completed);
    assert_eq!(created.user_id, USER_ID);
    assert_eq!(db.lock().unwrap().todos.len(), 2);
}

#[tokio::test]
async fn update_returns_server_copy() {
    let (addr, _db) = serve(vec![todo(1, USER_ID)]).await;
    let api = client(addr, "");

    let mut changed = todo(1, USER_ID);
    changed.completed = true;
    changed.title = "renamed".to_string();

    let updated = api.update(&changed).await.unwrap();
    assert_eq!(updated, changed);
}

#[tokio::test]
async fn delete_then_missing_is_status_error() {
    let (addr, db) = serve(vec![todo(1, USER_ID)]).await;
    let api = client(addr, "");

    api.delete(1).await.unwrap();
    assert!(db.lock().unwrap().todos.is_empty());

    match api.delete(1).await {
        Err(AppError::Status { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let (addr, _db) = serve(vec![]).await;
    let api = client(addr, "/broken");

    assert!(matches!(api.list().await, Err(AppError::Decode(_))));
}

#[tokio::test]
async fn unreachable_server_is_http_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(addr, "");
    assert!(matches!(api.list().await, Err(AppError::Http(_))));
}

#[test]
fn config_trims_trailing_slash() {
    let config = ApiConfig::new("http://localhost:3000/api/", 1);
    assert_eq!(config.base_url, "http://localhost:3000/api");
    assert_eq!(config.user_id, 1);
}
