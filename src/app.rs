use crate::{
    api::{ApiClient, DownloadDraft},
    catalog::{transfer, Shelf},
    config::AppConfig,
    session::{self, AddWorkflow, FollowUp, SyncMessage, SyncState},
};
use anyhow::Result;
use std::{
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread,
    time::{Duration, Instant},
};
use time::OffsetDateTime;

const TOAST_SECS: u64 = 4;
const LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Available,
    Queued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: OffsetDateTime,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Password,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub field: Option<LoginField>,
}

impl LoginForm {
    fn active_buffer(&mut self) -> Option<&mut String> {
        match self.field {
            Some(LoginField::Username) => Some(&mut self.username),
            Some(LoginField::Password) => Some(&mut self.password),
            None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    EditSavedir { buffer: String },
}

pub struct App {
    pub config: AppConfig,
    pub api: ApiClient,
    pub shelf: Shelf,
    pub sync: SyncState,
    pub add: AddWorkflow,
    pub focus: Focus,
    pub available_cursor: usize,
    pub queued_cursor: usize,
    pub add_cursor: usize,
    pub login: LoginForm,
    pub input: InputMode,
    pub log: Vec<LogEntry>,
    pub toast: Option<Toast>,
    pub should_quit: bool,
    sync_tx: Sender<SyncMessage>,
    sync_rx: Receiver<SyncMessage>,
}

impl App {
    /// Loads the config, applies the CLI server override, and probes auth
    /// immediately; an authenticated session chains straight into the
    /// first manifest fetch.
    pub fn initialize(server_override: Option<String>) -> Result<Self> {
        let mut config = AppConfig::load_or_create()?;
        if let Some(server_url) = server_override {
            config.server_url = server_url;
        }
        let mut app = App::new(config);
        app.log_info(format!("Using server {}", app.api.base_url()));
        app.start_auth_check();
        Ok(app)
    }

    pub fn new(config: AppConfig) -> Self {
        let api = ApiClient::new(&config.server_url);
        let (sync_tx, sync_rx) = mpsc::channel();
        Self {
            config,
            api,
            shelf: Shelf::default(),
            sync: SyncState::default(),
            add: AddWorkflow::default(),
            focus: Focus::Available,
            available_cursor: 0,
            queued_cursor: 0,
            add_cursor: 0,
            login: LoginForm {
                field: Some(LoginField::Username),
                ..LoginForm::default()
            },
            input: InputMode::Normal,
            log: Vec::new(),
            toast: None,
            should_quit: false,
            sync_tx,
            sync_rx,
        }
    }

    pub fn tick(&mut self) {
        if let Some(toast) = &self.toast {
            if Instant::now() >= toast.expires_at {
                self.toast = None;
            }
        }
    }

    // --- remote actions ------------------------------------------------

    fn spawn_action<F>(&mut self, task: F)
    where
        F: FnOnce(ApiClient) -> SyncMessage + Send + 'static,
    {
        self.sync.busy = true;
        let api = self.api.clone();
        let tx = self.sync_tx.clone();
        thread::spawn(move || {
            let _ = tx.send(task(api));
        });
    }

    pub fn start_auth_check(&mut self) {
        self.spawn_action(|api| {
            SyncMessage::AuthChecked(api.check_auth().map_err(|err| err.to_string()))
        });
    }

    pub fn submit_login(&mut self) {
        let username = self.login.username.trim().to_string();
        let password = self.login.password.clone();
        if username.is_empty() || password.is_empty() {
            self.set_toast("Enter email and password", ToastLevel::Warn);
            return;
        }
        self.log_info(format!("Logging in as {username}"));
        self.spawn_action(move |api| {
            SyncMessage::LoggedIn(api.login(&username, &password).map_err(|err| err.to_string()))
        });
    }

    pub fn start_manifest_fetch(&mut self) {
        self.spawn_action(|api| {
            SyncMessage::ManifestFetched(api.fetch_manifest().map_err(|err| err.to_string()))
        });
    }

    pub fn start_update(&mut self) {
        if self.sync.busy {
            return;
        }
        self.sync.begin_update();
        self.log_info("Requested catalog update".to_string());
        let os_list = self.config.os_list.clone();
        let lang_list = self.config.lang_list.clone();
        self.spawn_action(move |api| {
            SyncMessage::CatalogUpdated(
                api.update_catalog(&os_list, &lang_list)
                    .map_err(|err| err.to_string()),
            )
        });
    }

    pub fn start_download(&mut self) {
        if self.sync.downloading {
            return;
        }
        let draft = DownloadDraft {
            savedir: self.config.savedir.clone(),
            os_list: self.config.os_list.clone(),
            lang_list: self.config.lang_list.clone(),
            ids: self.shelf.queued.ids(),
            compress_downloads: self.config.compress_downloads,
        };
        if draft.ids.is_empty() {
            self.set_toast("Download queue is empty", ToastLevel::Warn);
            return;
        }
        self.sync.begin_download();
        self.log_info(format!(
            "Submitting {} game(s) for download to {}",
            draft.ids.len(),
            draft.savedir
        ));
        self.spawn_action(move |api| {
            SyncMessage::DownloadSubmitted(api.submit_download(&draft).map_err(|err| err.to_string()))
        });
    }

    pub fn confirm_add(&mut self) {
        if self.add.selection.is_empty() {
            return;
        }
        let ids: Vec<String> = self.add.selection.ids().iter().cloned().collect();
        let savedir = self.config.savedir.clone();
        self.log_info(format!("Marking {} game(s) as already downloaded", ids.len()));
        self.spawn_action(move |api| {
            SyncMessage::GamesAdded(
                api.add_without_download(&ids, &savedir)
                    .map_err(|err| err.to_string()),
            )
        });
    }

    // --- reconciliation ------------------------------------------------

    pub fn poll_sync(&mut self) {
        loop {
            match self.sync_rx.try_recv() {
                Ok(message) => self.handle_sync_message(message),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn handle_sync_message(&mut self, message: SyncMessage) {
        match &message {
            SyncMessage::AuthChecked(Ok(())) => {
                self.log_info("Authenticated with server".to_string());
            }
            SyncMessage::AuthChecked(Err(error)) => {
                self.log_warn(error.clone());
            }
            SyncMessage::LoggedIn(Ok(outcome)) => {
                let text = outcome.clone();
                self.log_info(text.clone());
                self.set_toast(&text, ToastLevel::Info);
            }
            SyncMessage::LoggedIn(Err(error)) => {
                let text = error.clone();
                self.log_error(text.clone());
                self.set_toast(&text, ToastLevel::Error);
            }
            SyncMessage::ManifestFetched(Ok(manifest)) => {
                self.log_info(format!(
                    "Game list refreshed ({} available, {} downloaded)",
                    manifest.available_games.len(),
                    manifest.downloaded_games.len()
                ));
            }
            SyncMessage::ManifestFetched(Err(error)) => {
                let text = error.clone();
                self.log_error(text.clone());
                self.set_toast(&text, ToastLevel::Error);
            }
            SyncMessage::CatalogUpdated(Ok(outcome))
            | SyncMessage::DownloadSubmitted(Ok(outcome))
            | SyncMessage::GamesAdded(Ok(outcome)) => {
                let text = outcome.clone();
                self.log_info(text.clone());
                self.set_toast(&text, ToastLevel::Info);
            }
            SyncMessage::CatalogUpdated(Err(error))
            | SyncMessage::DownloadSubmitted(Err(error))
            | SyncMessage::GamesAdded(Err(error)) => {
                let text = error.clone();
                self.log_error(text.clone());
                self.set_toast(&text, ToastLevel::Error);
            }
        }

        let follow_up = session::apply(&mut self.sync, &mut self.shelf, &mut self.add, message);
        self.clamp_cursors();
        match follow_up {
            Some(FollowUp::CheckAuth) => self.start_auth_check(),
            Some(FollowUp::FetchManifest) => self.start_manifest_fetch(),
            None => {}
        }
    }

    // --- browsing intents ----------------------------------------------

    pub fn switch_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Available => Focus::Queued,
            Focus::Queued => Focus::Available,
        };
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let (cursor, len) = match self.focus {
            Focus::Available => (&mut self.available_cursor, self.shelf.available.len()),
            Focus::Queued => (&mut self.queued_cursor, self.shelf.queued.len()),
        };
        *cursor = step(*cursor, delta, len);
    }

    pub fn toggle_current(&mut self) {
        match self.focus {
            Focus::Available => {
                if let Some(game) = self.shelf.available.get(self.available_cursor) {
                    let id = game.id.clone();
                    self.shelf
                        .available_selection
                        .toggle(&id, &self.shelf.available);
                }
            }
            Focus::Queued => {
                if let Some(game) = self.shelf.queued.get(self.queued_cursor) {
                    let id = game.id.clone();
                    self.shelf.queued_selection.toggle(&id, &self.shelf.queued);
                }
            }
        }
    }

    /// available -> queued for the current selection.
    pub fn queue_selected(&mut self) {
        transfer(
            &mut self.shelf.available,
            &mut self.shelf.queued,
            &mut self.shelf.available_selection,
        );
        self.clamp_cursors();
    }

    /// queued -> available for the current selection.
    pub fn unqueue_selected(&mut self) {
        transfer(
            &mut self.shelf.queued,
            &mut self.shelf.available,
            &mut self.shelf.queued_selection,
        );
        self.clamp_cursors();
    }

    pub fn clamp_cursors(&mut self) {
        self.available_cursor = clamp(self.available_cursor, self.shelf.available.len());
        self.queued_cursor = clamp(self.queued_cursor, self.shelf.queued.len());
        self.add_cursor = clamp(self.add_cursor, self.shelf.available.len());
    }

    // --- add-without-download workflow ---------------------------------

    pub fn open_add(&mut self) {
        self.add.open = true;
        self.add_cursor = 0;
    }

    pub fn cancel_add(&mut self) {
        self.add.open = false;
        self.add.selection.clear();
    }

    pub fn add_move_cursor(&mut self, delta: isize) {
        self.add_cursor = step(self.add_cursor, delta, self.shelf.available.len());
    }

    pub fn toggle_add_current(&mut self) {
        if let Some(game) = self.shelf.available.get(self.add_cursor) {
            let id = game.id.clone();
            self.add.selection.toggle(&id, &self.shelf.available);
        }
    }

    // --- login form -----------------------------------------------------

    pub fn login_switch_field(&mut self) {
        self.login.field = match self.login.field {
            Some(LoginField::Username) => Some(LoginField::Password),
            _ => Some(LoginField::Username),
        };
    }

    pub fn login_input(&mut self, ch: char) {
        if let Some(buffer) = self.login.active_buffer() {
            buffer.push(ch);
        }
    }

    pub fn login_backspace(&mut self) {
        if let Some(buffer) = self.login.active_buffer() {
            buffer.pop();
        }
    }

    // --- savedir / compress ---------------------------------------------

    pub fn begin_edit_savedir(&mut self) {
        self.input = InputMode::EditSavedir {
            buffer: self.config.savedir.clone(),
        };
    }

    pub fn input_char(&mut self, ch: char) {
        if let InputMode::EditSavedir { buffer } = &mut self.input {
            buffer.push(ch);
        }
    }

    pub fn input_backspace(&mut self) {
        if let InputMode::EditSavedir { buffer } = &mut self.input {
            buffer.pop();
        }
    }

    pub fn cancel_input(&mut self) {
        self.input = InputMode::Normal;
    }

    pub fn submit_savedir(&mut self) {
        let mode = std::mem::replace(&mut self.input, InputMode::Normal);
        if let InputMode::EditSavedir { buffer } = mode {
            let savedir = buffer.trim().to_string();
            if !savedir.is_empty() {
                self.config.savedir = savedir;
                self.persist_config();
            }
        }
    }

    pub fn toggle_compress(&mut self) {
        self.config.compress_downloads = !self.config.compress_downloads;
        self.persist_config();
    }

    fn persist_config(&mut self) {
        if let Err(err) = self.config.save() {
            self.log_warn(format!("Could not save config: {err}"));
        }
    }

    // --- feedback --------------------------------------------------------

    pub fn set_toast(&mut self, message: &str, level: ToastLevel) {
        self.toast = Some(Toast {
            message: message.to_string(),
            level,
            expires_at: Instant::now() + Duration::from_secs(TOAST_SECS),
        });
    }

    pub fn log_info(&mut self, message: String) {
        self.push_log(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: String) {
        self.push_log(LogLevel::Warn, message);
    }

    pub fn log_error(&mut self, message: String) {
        self.push_log(LogLevel::Error, message);
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        self.log.push(LogEntry {
            at: OffsetDateTime::now_utc(),
            level,
            message,
        });
        if self.log.len() > LOG_CAPACITY {
            let overflow = self.log.len() - LOG_CAPACITY;
            self.log.drain(..overflow);
        }
    }
}

fn clamp(cursor: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        cursor.min(len - 1)
    }
}

fn step(cursor: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let moved = cursor as isize + delta;
    moved.clamp(0, len as isize - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Game;

    fn app_with_games() -> App {
        let mut app = App::new(AppConfig::default());
        app.shelf.available.replace_all(vec![
            Game::new("2", "Beneath a Steel Sky"),
            Game::new("1", "Anachronox"),
        ]);
        app
    }

    #[test]
    fn toggle_and_queue_moves_games() {
        let mut app = app_with_games();
        app.toggle_current();
        app.move_cursor(1);
        app.toggle_current();

        app.queue_selected();

        assert!(app.shelf.available.is_empty());
        assert_eq!(app.shelf.queued.len(), 2);
        assert!(app.shelf.available_selection.is_empty());
        let titles: Vec<&str> = app
            .shelf
            .queued
            .ordered()
            .iter()
            .map(|g| g.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Anachronox", "Beneath a Steel Sky"]);
    }

    #[test]
    fn queue_with_empty_selection_is_noop() {
        let mut app = app_with_games();
        app.queue_selected();
        assert_eq!(app.shelf.available.len(), 2);
        assert!(app.shelf.queued.is_empty());
    }

    #[test]
    fn cursor_clamps_after_transfer() {
        let mut app = app_with_games();
        app.move_cursor(1);
        assert_eq!(app.available_cursor, 1);
        app.toggle_current();
        app.queue_selected();
        // One game left; the cursor must land on it, not past the end.
        assert_eq!(app.available_cursor, 0);
    }

    #[test]
    fn add_picker_toggles_against_available() {
        let mut app = app_with_games();
        app.open_add();
        app.toggle_add_current();
        assert_eq!(app.add.selection.len(), 1);
        app.cancel_add();
        assert!(!app.add.open);
        assert!(app.add.selection.is_empty());
    }

    #[test]
    fn savedir_edit_round_trip() {
        let mut app = app_with_games();
        app.begin_edit_savedir();
        app.input_char('!');
        app.cancel_input();
        assert_eq!(app.input, InputMode::Normal);
        assert_ne!(app.config.savedir, "!");
    }
}
