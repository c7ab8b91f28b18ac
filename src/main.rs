use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todoapp::api::{ApiConfig, HttpTodoApi};
use todoapp::models::FilterMode;
use todoapp::services::{ItemEditor, Notifier, TodoListService};
use todoapp::state::TodoView;

const HELP: &str = "\
commands:
  add <title>         add a todo
  toggle <id>         flip a todo's completed flag
  rm <id>             delete a todo
  edit <id> <title>   rename a todo (empty title deletes it)
  all                 toggle all
  clear               clear completed
  filter <mode>       all | active | completed
  dismiss             hide the error banner
  ls                  show the list
  quit";

#[derive(Debug, PartialEq)]
enum Command {
    Add(String),
    Toggle(i64),
    Remove(i64),
    Edit(i64, String),
    ToggleAll,
    ClearCompleted,
    Filter(FilterMode),
    Dismiss,
    List,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim_start();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let parse_id = |s: &str| {
            s.trim()
                .trim_start_matches('#')
                .parse::<i64>()
                .map_err(|_| format!("not a todo id: {}", s.trim()))
        };

        match word.trim() {
            "add" => Ok(Command::Add(rest.to_string())),
            "toggle" => parse_id(rest).map(Command::Toggle),
            "rm" => parse_id(rest).map(Command::Remove),
            "edit" => {
                let rest = rest.trim_start();
                let (id, title) = rest.split_once(' ').unwrap_or((rest, ""));
                Ok(Command::Edit(parse_id(id)?, title.to_string()))
            }
            "all" => Ok(Command::ToggleAll),
            "clear" => Ok(Command::ClearCompleted),
            "filter" => rest.parse().map(Command::Filter),
            "dismiss" => Ok(Command::Dismiss),
            "ls" | "" => Ok(Command::List),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command: {} (try `help`)", other)),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "todoapp=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ApiConfig::new_from_env()?;
    info!("using {} as user {}", config.base_url, config.user_id);

    let api = Arc::new(HttpTodoApi::new(config)?);
    let service = TodoListService::new(api, Notifier::new());

    service.load().await;
    render(&service.view());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => dispatch(&service, command).await,
            Err(msg) => println!("{}", msg),
        }
    }

    Ok(())
}

async fn dispatch(service: &TodoListService, command: Command) {
    match command {
        Command::Add(title) => {
            if service.view().creating {
                println!("still adding the previous todo");
                return;
            }
            spawn_action(service, |s| async move {
                s.create(&title).await;
            });
        }
        Command::Toggle(id) => {
            let Some(todo) = lookup(service, id) else { return };
            spawn_action(service, |s| async move {
                s.toggle(&todo).await;
            });
        }
        Command::Remove(id) => {
            spawn_action(service, |s| async move {
                s.delete(id).await;
            });
        }
        Command::Edit(id, title) => {
            let Some(todo) = lookup(service, id) else { return };
            let mut editor = ItemEditor::new(todo);
            editor.begin();
            editor.set_text(title);
            spawn_action(service, |s| async move {
                editor.submit(&s).await;
            });
        }
        Command::ToggleAll => {
            if !service.view().show_toggle_all() {
                println!("nothing to toggle");
                return;
            }
            spawn_action(service, |s| async move {
                s.toggle_all().await;
            });
        }
        Command::ClearCompleted => {
            if !service.view().can_clear_completed {
                println!("no completed todos");
                return;
            }
            spawn_action(service, |s| async move {
                s.clear_completed().await;
            });
        }
        Command::Filter(mode) => service.set_filter(mode),
        Command::Dismiss => service.dismiss_notice(),
        Command::List => {}
        Command::Help => {
            println!("{}", HELP);
            return;
        }
        Command::Quit => return,
    }

    // let freshly spawned actions mark themselves pending before rendering
    tokio::task::yield_now().await;
    render(&service.view());
}

fn lookup(service: &TodoListService, id: i64) -> Option<todoapp::models::Todo> {
    let todo = service.find(id);
    if todo.is_none() {
        println!("no todo #{}", id);
    }
    todo
}

/// Runs `action` in the background and re-renders once it settles.
fn spawn_action<F, Fut>(service: &TodoListService, action: F)
where
    F: FnOnce(TodoListService) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let service = service.clone();
    let run = action(service.clone());
    tokio::spawn(async move {
        run.await;
        render(&service.view());
    });
}

fn render(view: &TodoView) {
    println!();
    if view.show_toggle_all() {
        let mark = if view.all_completed { "x" } else { " " };
        println!("[{}] toggle all", mark);
    }

    for todo in &view.visible {
        let mark = if todo.completed { "x" } else { " " };
        let busy = if view.is_busy(todo.id) { "  …" } else { "" };
        println!("  [{}] #{} {}{}", mark, todo.id, todo.title.trim(), busy);
    }
    if let Some(placeholder) = &view.placeholder {
        println!("  [ ] {}  …", placeholder.title);
    }

    if view.show_footer() {
        let clear = if view.can_clear_completed { "clear completed" } else { "-" };
        let filters = FilterMode::ALL
            .iter()
            .map(|mode| {
                if *mode == view.filter {
                    format!("*{}*", mode)
                } else {
                    mode.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        println!("{} | {} | {}", view.items_left_label(), filters, clear);
    }

    if let Some(notice) = view.notice {
        println!("! {}  (dismiss)", notice);
    }
}
