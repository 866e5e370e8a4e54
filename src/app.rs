use std::path::PathBuf;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::mpsc;

use crate::action::Action;
use crate::clone::{ensure_selection, CloneDispatcher};
use crate::config::expand_home;
use crate::forge::Forge;
use crate::form::SearchForm;
use crate::search::fetch_page;
use crate::session::{Navigation, PageRequest, SearchSession};
use crate::tui::Event;
use crate::types::{CloneEvent, CloneOutcome, CloneReport, RecordKey, RepoRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Search,
    Results,
}

#[derive(Debug, Clone)]
pub enum Popup {
    BranchSelect {
        key: RecordKey,
        selected: usize,
    },
    Destination {
        input: String,
    },
    Cloning {
        finished: usize,
        total: usize,
        recent: Vec<CloneOutcome>,
    },
    Report {
        report: CloneReport,
        /// Highlighted row of the failure list.
        selected: usize,
    },
}

/// Startup settings resolved from config and command line.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub default_token: Option<String>,
    pub clone_dir: PathBuf,
    /// Run the search in the form as soon as the UI starts.
    pub autostart: bool,
}

pub struct App {
    pub screen: Screen,
    pub form: SearchForm,
    pub session: SearchSession,
    pub cursor: usize,
    pub popup: Option<Popup>,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub spinner: usize,
    pub should_quit: bool,
    options: AppOptions,
    forge: Arc<dyn Forge>,
    dispatcher: Arc<CloneDispatcher>,
    action_tx: mpsc::UnboundedSender<Action>,
}

impl App {
    pub fn new(
        forge: Arc<dyn Forge>,
        dispatcher: CloneDispatcher,
        form: SearchForm,
        options: AppOptions,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        Self {
            screen: Screen::Search,
            form,
            session: SearchSession::new(),
            cursor: 0,
            popup: None,
            error: None,
            notice: None,
            spinner: 0,
            should_quit: false,
            options,
            forge,
            dispatcher: Arc::new(dispatcher),
            action_tx,
        }
    }

    pub fn loading(&self) -> bool {
        self.session.is_fetching()
    }

    pub fn forge_name(&self) -> &str {
        self.forge.name()
    }

    pub fn current_key(&self) -> Option<RecordKey> {
        if self.screen != Screen::Results || self.cursor >= self.session.current_records().len() {
            return None;
        }
        Some(RecordKey {
            page: self.session.current_page(),
            index: self.cursor,
        })
    }

    pub fn current_record(&self) -> Option<&RepoRecord> {
        self.session.cache().record(self.current_key()?)
    }

    pub fn handle_event(&self, event: Event) -> Action {
        match event {
            Event::Init if self.options.autostart => Action::Search,
            Event::Tick => Action::Tick,
            Event::Key(key) => self.handle_key(key),
            _ => Action::None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Action {
        if let Some(popup) = &self.popup {
            return Self::handle_popup_key(popup, key);
        }

        match self.screen {
            Screen::Search => self.handle_form_key(key),
            Screen::Results => Self::handle_results_key(key),
        }
    }

    fn handle_form_key(&self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Enter => Action::Search,
            KeyCode::Tab | KeyCode::Down => Action::NextField,
            KeyCode::BackTab | KeyCode::Up => Action::PrevField,
            KeyCode::Right => Action::CycleNext,
            KeyCode::Left => Action::CyclePrev,
            KeyCode::Backspace => Action::Backspace,
            KeyCode::Char(c) if self.form.field.is_text() => Action::Input(c),
            KeyCode::Char(' ') => Action::CycleNext,
            KeyCode::Char('q') => Action::Quit,
            _ => Action::None,
        }
    }

    fn handle_results_key(key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Back,
            KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
            KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
            KeyCode::Char('g') | KeyCode::Home => Action::GoToTop,
            KeyCode::Char('G') | KeyCode::End => Action::GoToBottom,
            KeyCode::Char(' ') => Action::ToggleSelected,
            KeyCode::Char('a') => Action::SelectAllPage,
            KeyCode::Char('A') => Action::SelectAllLoaded,
            KeyCode::Char('b') | KeyCode::Enter => Action::ShowBranchSelect,
            KeyCode::Char('n') | KeyCode::Right => Action::NextPage,
            KeyCode::Char('p') | KeyCode::Left => Action::PrevPage,
            KeyCode::Char('c') => Action::StartClone,
            KeyCode::Char('o') => Action::OpenInBrowser,
            KeyCode::Char('y') => Action::YankUrl,
            KeyCode::Char('/') | KeyCode::Char('s') => Action::NewSearch,
            _ => Action::None,
        }
    }

    fn handle_popup_key(popup: &Popup, key: KeyEvent) -> Action {
        match popup {
            Popup::BranchSelect { .. } => match key.code {
                KeyCode::Char('j') | KeyCode::Down => Action::PopupDown,
                KeyCode::Char('k') | KeyCode::Up => Action::PopupUp,
                KeyCode::Enter => Action::PopupSelect,
                KeyCode::Esc | KeyCode::Char('q') => Action::Back,
                _ => Action::None,
            },
            Popup::Destination { .. } => match key.code {
                KeyCode::Enter => Action::ConfirmClone,
                KeyCode::Esc => Action::Back,
                KeyCode::Backspace => Action::Backspace,
                KeyCode::Char(c) => Action::Input(c),
                _ => Action::None,
            },
            // Modal until the batch reports completion.
            Popup::Cloning { .. } => Action::None,
            Popup::Report { .. } => match key.code {
                KeyCode::Char('j') | KeyCode::Down => Action::PopupDown,
                KeyCode::Char('k') | KeyCode::Up => Action::PopupUp,
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => Action::Back,
                _ => Action::None,
            },
        }
    }

    pub fn update(&mut self, action: Action) {
        if !matches!(
            action,
            Action::Tick | Action::None | Action::PageLoaded(..) | Action::CloneProgress(_)
        ) {
            self.error = None;
            self.notice = None;
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
            }
            Action::Back => match &self.popup {
                Some(Popup::Cloning { .. }) => {}
                Some(_) => self.popup = None,
                None => match self.screen {
                    // Leaving mid-fetch abandons the search.
                    Screen::Results if self.session.is_fetching() => {
                        self.session.reset();
                        self.screen = Screen::Search;
                    }
                    Screen::Results => self.screen = Screen::Search,
                    Screen::Search => self.should_quit = true,
                },
            },
            Action::Tick => {
                self.spinner = self.spinner.wrapping_add(1);
            }
            Action::ScrollUp => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            Action::ScrollDown => {
                if self.cursor + 1 < self.session.current_records().len() {
                    self.cursor += 1;
                }
            }
            Action::GoToTop => {
                self.cursor = 0;
            }
            Action::GoToBottom => {
                self.cursor = self.session.current_records().len().saturating_sub(1);
            }

            // Search form
            Action::NextField => self.form.next_field(),
            Action::PrevField => self.form.prev_field(),
            Action::CycleNext => self.form.cycle(true),
            Action::CyclePrev => self.form.cycle(false),
            Action::Input(c) => match &mut self.popup {
                Some(Popup::Destination { input }) => input.push(c),
                _ => self.form.input(c),
            },
            Action::Backspace => match &mut self.popup {
                Some(Popup::Destination { input }) => {
                    input.pop();
                }
                _ => self.form.backspace(),
            },
            Action::Search => self.start_search(),
            Action::NewSearch => {
                self.screen = Screen::Search;
            }

            // Paging
            Action::NextPage => {
                let nav = self.session.next();
                self.navigate(nav);
            }
            Action::PrevPage => {
                let nav = self.session.prev();
                self.navigate(nav);
            }
            Action::PageLoaded(request, result) => match self.session.complete(&request, result) {
                Ok(true) => self.cursor = 0,
                Ok(false) => {}
                Err(e) => self.error = Some(e.to_string()),
            },

            // Selection
            Action::ToggleSelected => {
                if let Some(key) = self.current_key() {
                    self.session.cache_mut().toggle(key);
                    // Move down so a run of records can be ticked quickly.
                    if self.cursor + 1 < self.session.current_records().len() {
                        self.cursor += 1;
                    }
                }
            }
            Action::SelectAllPage => {
                let page = self.session.current_page();
                self.session.cache_mut().select_all_on_page(page);
            }
            Action::SelectAllLoaded => {
                self.session.cache_mut().select_all_loaded();
            }
            Action::ShowBranchSelect => {
                let Some(key) = self.current_key() else {
                    return;
                };
                let selected = self
                    .session
                    .cache()
                    .record(key)
                    .and_then(|r| r.branches.iter().position(|b| *b == r.chosen_branch))
                    .unwrap_or(0);
                self.popup = Some(Popup::BranchSelect { key, selected });
            }

            // Popup navigation
            Action::PopupUp => match &mut self.popup {
                Some(Popup::BranchSelect { selected, .. }) | Some(Popup::Report { selected, .. }) => {
                    *selected = selected.saturating_sub(1);
                }
                _ => {}
            },
            Action::PopupDown => {
                let branches = self.current_record().map_or(0, |r| r.branches.len());
                let (selected, count) = match &mut self.popup {
                    Some(Popup::BranchSelect { selected, .. }) => (selected, branches),
                    Some(Popup::Report { report, selected }) => (selected, report.failed.len()),
                    _ => return,
                };
                if *selected + 1 < count {
                    *selected += 1;
                }
            }
            Action::PopupSelect => {
                if let Some(Popup::BranchSelect { key, selected }) = self.popup.take() {
                    let branch = self
                        .session
                        .cache()
                        .record(key)
                        .and_then(|r| r.branches.get(selected).cloned());
                    if let Some(branch) = branch {
                        if let Err(e) = self.session.cache_mut().set_branch(key, &branch) {
                            self.error = Some(e.to_string());
                        }
                    }
                }
            }

            // Cloning
            Action::StartClone => {
                let selected = self.session.cache().collect_selected();
                match ensure_selection(&selected) {
                    Ok(()) => {
                        self.popup = Some(Popup::Destination {
                            input: self.options.clone_dir.display().to_string(),
                        });
                    }
                    Err(e) => self.error = Some(e.to_string()),
                }
            }
            Action::ConfirmClone => {
                if let Some(Popup::Destination { input }) = self.popup.take() {
                    self.start_clone(&input);
                }
            }
            Action::CloneProgress(event) => self.on_clone_event(event),
            Action::CloneAborted(msg) => {
                self.popup = None;
                self.error = Some(msg);
            }

            Action::OpenInBrowser => {
                if let Some(url) = self.current_record().map(|r| r.url.clone()) {
                    if let Err(e) = open::that(&url) {
                        self.error = Some(format!("Failed to open browser: {}", e));
                    }
                }
            }
            Action::YankUrl => {
                if let Some(url) = self.current_record().map(|r| r.url.clone()) {
                    match arboard::Clipboard::new().and_then(|mut c| c.set_text(url.clone())) {
                        Ok(()) => self.notice = Some(format!("Copied {}", url)),
                        Err(e) => self.error = Some(format!("Clipboard error: {}", e)),
                    }
                }
            }

            Action::None => {}
        }
    }

    fn start_search(&mut self) {
        let query = match self.form.build_query(self.options.default_token.as_deref()) {
            Ok(query) => query,
            Err(e) => {
                self.error = Some(e.to_string());
                return;
            }
        };

        match self.session.start_search(query) {
            Ok(request) => {
                self.screen = Screen::Results;
                self.cursor = 0;
                self.spawn_fetch(request);
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    fn navigate(&mut self, nav: Navigation) {
        match nav {
            Navigation::Cached => self.cursor = 0,
            Navigation::Fetch(request) => self.spawn_fetch(request),
            Navigation::Blocked => {}
        }
    }

    fn spawn_fetch(&self, request: PageRequest) {
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        tokio::spawn(async move {
            let result = fetch_page(forge.as_ref(), &request.query, request.page).await;
            tx.send(Action::PageLoaded(request, result)).ok();
        });
    }

    fn start_clone(&mut self, input: &str) {
        let destination = match input.trim() {
            "" => self.options.clone_dir.clone(),
            path => expand_home(path),
        };
        let selected = self.session.cache().collect_selected();
        if let Err(e) = ensure_selection(&selected) {
            self.error = Some(e.to_string());
            return;
        }

        self.popup = Some(Popup::Cloning {
            finished: 0,
            total: selected.len(),
            recent: Vec::new(),
        });

        let tx = self.action_tx.clone();
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            if let Err(e) = tokio::fs::create_dir_all(&destination).await {
                let msg = format!("Cannot use {}: {}", destination.display(), e);
                tx.send(Action::CloneAborted(msg)).ok();
                return;
            }

            let mut rx = match dispatcher.dispatch(selected, destination) {
                Ok(rx) => rx,
                Err(e) => {
                    tx.send(Action::CloneAborted(e.to_string())).ok();
                    return;
                }
            };
            while let Some(event) = rx.recv().await {
                if tx.send(Action::CloneProgress(event)).is_err() {
                    break;
                }
            }
        });
    }

    fn on_clone_event(&mut self, event: CloneEvent) {
        match event {
            CloneEvent::Progress {
                outcome,
                finished: done,
                total: count,
            } => {
                if let Some(Popup::Cloning {
                    finished,
                    total,
                    recent,
                }) = &mut self.popup
                {
                    *finished = done;
                    *total = count;
                    recent.push(outcome);
                }
            }
            CloneEvent::AllDone(report) => {
                self.popup = Some(Popup::Report {
                    report,
                    selected: 0,
                });
            }
        }
    }
}
