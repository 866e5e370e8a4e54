mod action;
mod app;
mod auth;
mod branches;
mod cache;
mod clone;
mod config;
mod error;
mod forge;
mod form;
mod github;
mod pagination;
mod search;
mod selection;
mod session;
mod tui;
mod types;
mod ui;

use std::fs::OpenOptions;
use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::action::Action;
use crate::app::{App, AppOptions};
use crate::clone::{CloneDispatcher, GitCli};
use crate::config::Config;
use crate::form::{FormMode, SearchForm};
use crate::github::GitHub;
use crate::tui::{Event, EventHandler};
use crate::types::{SortKey, SortOrder};

/// Find GitHub repositories by language or owner and clone them in bulk.
#[derive(Debug, Parser)]
#[command(name = "grab", version, about)]
struct Cli {
    /// Language to search for
    #[arg(short, long)]
    language: Option<String>,

    /// List an owner's repositories instead of searching by language
    #[arg(short, long)]
    owner: Option<String>,

    #[arg(long, value_enum)]
    sort: Option<SortKey>,

    #[arg(long, value_enum)]
    order: Option<SortOrder>,

    /// Results per page (1-100)
    #[arg(long)]
    per_page: Option<String>,

    /// GitHub token, overrides the environment and config
    #[arg(long)]
    token: Option<String>,

    /// Default clone destination
    #[arg(short, long)]
    dest: Option<PathBuf>,

    /// Maximum concurrent clones (0 for unbounded)
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// GitHub API base URL
    #[arg(long)]
    api_url: Option<String>,
}

/// Log to a file under the cache dir so output does not tear the TUI.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let log_file = dirs::cache_dir()
        .map(|dir| dir.join("grab"))
        .and_then(|dir| {
            std::fs::create_dir_all(&dir).ok()?;
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("grab.log"))
                .ok()
        });

    let registry = tracing_subscriber::registry().with(filter);
    match log_file {
        Some(file) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init(),
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn apply_cli(config: &mut Config, cli: &Cli) -> SearchForm {
    if let Some(url) = &cli.api_url {
        config.github.api_url = url.clone();
    }
    if let Some(limit) = cli.concurrency {
        config.general.clone_concurrency = Some(limit);
    }

    let mut form = SearchForm::from_config(config);
    if let Some(language) = &cli.language {
        form.language = language.clone();
    }
    if let Some(owner) = &cli.owner {
        form.mode = FormMode::Owner;
        form.owner = owner.clone();
    }
    if let Some(sort) = cli.sort {
        form.sort = sort;
    }
    if let Some(order) = cli.order {
        form.order = order;
    }
    if let Some(per_page) = &cli.per_page {
        form.per_page = per_page.clone();
    }
    form
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging();

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = tui::restore();
        original_hook(panic_info);
    }));

    let mut config = Config::load();
    let form = apply_cli(&mut config, &cli);

    let options = AppOptions {
        default_token: auth::load_token(cli.token.as_deref(), &config.github),
        clone_dir: cli
            .dest
            .clone()
            .or_else(|| config.clone_dir())
            .unwrap_or_else(|| PathBuf::from(".")),
        autostart: cli.language.is_some() || cli.owner.is_some(),
    };

    let github = GitHub::new(&config.github.api_url)?;
    let dispatcher =
        CloneDispatcher::new(Arc::new(GitCli)).with_concurrency(config.general.clone_concurrency);

    let result = run(Arc::new(github), dispatcher, form, options).await;

    tui::restore()?;

    result
}

async fn run(
    github: Arc<GitHub>,
    dispatcher: CloneDispatcher,
    form: SearchForm,
    options: AppOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut terminal = tui::init()?;

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut app = App::new(github, dispatcher, form, options, action_tx.clone());

    let tick_rate = Duration::from_millis(250);
    let render_rate = Duration::from_millis(16); // ~60fps
    let mut events = EventHandler::new(tick_rate, render_rate);

    loop {
        tokio::select! {
            Some(event) = events.next() => {
                if event.is_quit() {
                    break;
                }

                match event {
                    Event::Render => {
                        terminal.draw(|frame| ui::render(frame, &app))?;
                    }
                    _ => {
                        let action = app.handle_event(event);
                        if !matches!(action, Action::None) {
                            action_tx.send(action)?;
                        }
                    }
                }
            }
            Some(action) = action_rx.recv() => {
                app.update(action);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
