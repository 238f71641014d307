use crate::api::sse::run_stream;
use crate::api::ApiClient;
use crate::config::{Config, SKILLS_SNAPSHOT_PATH};
use crate::state::editor::FileEditor;
use crate::state::replay::reconstruct;
use crate::state::skills::extract_skill_paths;
use crate::state::timeline::{fold, push_user_message, TimelineItem};
use crate::terminal::TerminalType;
use crate::types::{ChatEvent, SessionSummary};
use crate::ui::layout::split_deck_layout;
use crate::ui::render::{
    render_editor_panel, render_input, render_session_bar, render_status_line, render_timeline,
    timeline_lines,
};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const TICK_INTERVAL: Duration = Duration::from_millis(50);
const SCROLL_PAGE: usize = 10;

/// Workspace files always offered in the editor path menu; skill paths from
/// the snapshot are appended after these.
const FIXED_WORKSPACE_PATHS: &[&str] = &[
    "memory/MEMORY.md",
    "workspace/AGENTS.md",
    "workspace/SOUL.md",
    "workspace/IDENTITY.md",
    "workspace/USER.md",
];

/// Message from the turn task back to the app loop.
pub enum TurnUpdate {
    Event(ChatEvent),
    Failed(String),
    Finished,
}

/// Key handling that needs the async client is deferred to the run loop.
enum AsyncAction {
    SwitchSession(isize),
    NewSession,
    CycleEditorPath,
    SaveEditorFile,
}

pub struct App {
    client: ApiClient,
    editor_path: String,
    sessions: Vec<SessionSummary>,
    sessions_dirty: bool,
    active_session_id: String,
    timeline: Vec<TimelineItem>,
    input: String,
    sending: bool,
    should_quit: bool,
    status: String,
    scroll_from_bottom: usize,
    editor: FileEditor,
    editor_visible: bool,
    editor_focused: bool,
    skill_paths: Vec<String>,
    editor_path_index: usize,
    cancel: Option<CancellationToken>,
    update_tx: mpsc::UnboundedSender<TurnUpdate>,
    update_rx: mpsc::UnboundedReceiver<TurnUpdate>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let client = ApiClient::new(&config);
        Self::with_client(client, &config.editor_path)
    }

    #[cfg(test)]
    pub fn new_mock(client: ApiClient) -> Self {
        Self::with_client(client, "memory/MEMORY.md")
    }

    fn with_client(client: ApiClient, editor_path: &str) -> Self {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        Self {
            client,
            editor_path: editor_path.to_string(),
            sessions: Vec::new(),
            sessions_dirty: false,
            active_session_id: "default".to_string(),
            timeline: Vec::new(),
            input: String::new(),
            sending: false,
            should_quit: false,
            status: String::new(),
            scroll_from_bottom: 0,
            editor: FileEditor::new(editor_path),
            editor_visible: false,
            editor_focused: false,
            skill_paths: Vec::new(),
            editor_path_index: 0,
            cancel: None,
            update_tx,
            update_rx,
        }
    }

    /// Loads sessions, the skills snapshot, the default editor file, and the
    /// most recent transcript. Every failure degrades to a status message; a
    /// missing snapshot simply means no skill paths.
    pub async fn initialize(&mut self) {
        match self.client.list_sessions().await {
            Ok(sessions) => self.sessions = sessions,
            Err(error) => self.status = format!("failed to load sessions: {error:#}"),
        }

        self.active_session_id = self
            .sessions
            .first()
            .map(|s| s.id.clone())
            .unwrap_or_else(|| "default".to_string());

        match self.client.read_file(SKILLS_SNAPSHOT_PATH).await {
            Ok(snapshot) => self.skill_paths = extract_skill_paths(&snapshot),
            Err(_) => self.skill_paths.clear(),
        }

        let editor_path = self.editor_path.clone();
        if let Err(error) = self.editor.load(&self.client, &editor_path).await {
            self.status = format!("failed to load {editor_path}: {error:#}");
        }

        if self.sessions.is_empty() {
            self.timeline.clear();
        } else {
            let session_id = self.active_session_id.clone();
            self.load_session(&session_id).await;
        }
    }

    pub async fn run(&mut self, terminal: &mut TerminalType) -> Result<()> {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);

        while !self.should_quit {
            tokio::select! {
                _ = ticker.tick() => {
                    while event::poll(Duration::from_millis(0))? {
                        let Event::Key(key) = event::read()? else {
                            continue;
                        };
                        if key.kind == KeyEventKind::Release {
                            continue;
                        }
                        if let Some(action) = self.handle_key(key) {
                            self.run_action(action).await;
                        }
                    }
                }
                update = self.update_rx.recv() => {
                    if let Some(update) = update {
                        self.apply_update(update);
                    }
                    if self.sessions_dirty && !self.sending {
                        self.reload_sessions().await;
                    }
                }
            }

            self.draw(terminal)?;
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<AsyncAction> {
        // Control chords stay global even while the editor buffer has focus.
        if self.editor_focused && !key.modifiers.contains(KeyModifiers::CONTROL) {
            return self.handle_editor_key(key);
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.cancel_turn();
                self.should_quit = true;
                None
            }
            KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(AsyncAction::SwitchSession(1))
            }
            KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(AsyncAction::SwitchSession(-1))
            }
            KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(AsyncAction::NewSession)
            }
            KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.editor_visible = !self.editor_visible;
                if !self.editor_visible {
                    self.editor_focused = false;
                }
                None
            }
            KeyCode::Char('o') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.editor_visible = true;
                Some(AsyncAction::CycleEditorPath)
            }
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(AsyncAction::SaveEditorFile)
            }
            KeyCode::Tab => {
                if self.editor_visible {
                    self.editor_focused = true;
                }
                None
            }
            KeyCode::Esc => {
                self.cancel_turn();
                None
            }
            KeyCode::Enter => {
                self.start_turn();
                None
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Up => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(1);
                None
            }
            KeyCode::Down => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(1);
                None
            }
            KeyCode::PageUp => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(SCROLL_PAGE);
                None
            }
            KeyCode::PageDown => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(SCROLL_PAGE);
                None
            }
            KeyCode::Char(ch)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT) =>
            {
                self.input.push(ch);
                None
            }
            _ => None,
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> Option<AsyncAction> {
        match key.code {
            KeyCode::Tab | KeyCode::Esc => {
                self.editor_focused = false;
            }
            KeyCode::Enter => self.edit_buffer(|content| content.push('\n')),
            KeyCode::Backspace => self.edit_buffer(|content| {
                content.pop();
            }),
            KeyCode::Char(ch) => self.edit_buffer(|content| content.push(ch)),
            _ => {}
        }
        None
    }

    fn edit_buffer(&mut self, edit: impl FnOnce(&mut String)) {
        let mut content = self.editor.content.clone();
        edit(&mut content);
        self.editor.set_content(content);
    }

    async fn run_action(&mut self, action: AsyncAction) {
        match action {
            AsyncAction::SwitchSession(direction) => self.switch_session(direction).await,
            AsyncAction::NewSession => self.new_session(),
            AsyncAction::CycleEditorPath => self.cycle_editor_path().await,
            AsyncAction::SaveEditorFile => match self.editor.save(&self.client).await {
                Ok(()) => self.status = format!("saved {}", self.editor.selected_path),
                Err(error) => self.status = format!("save failed: {error:#}"),
            },
        }
    }

    /// Kicks off one chat turn. Re-entrancy is gated here: the core stream
    /// driver does not serialize concurrent sends, so the app must.
    fn start_turn(&mut self) {
        if self.sending {
            self.status = "a turn is already in flight".to_string();
            return;
        }

        let message = self.input.trim().to_string();
        if message.is_empty() {
            return;
        }
        self.input.clear();

        self.timeline = push_user_message(std::mem::take(&mut self.timeline), message.clone());
        self.scroll_from_bottom = 0;
        self.sending = true;
        self.status = "sending…".to_string();

        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());

        let client = self.client.clone();
        let session_id = self.active_session_id.clone();
        let tx = self.update_tx.clone();

        tokio::spawn(async move {
            let event_tx = tx.clone();
            let turn = async {
                let stream = client.open_chat_stream(&message, &session_id).await?;
                run_stream(stream, cancel.clone(), move |chat_event| {
                    let _ = event_tx.send(TurnUpdate::Event(chat_event));
                })
                .await
            };

            let result = tokio::select! {
                _ = cancel.cancelled() => Ok(()),
                result = turn => result,
            };

            match result {
                Ok(()) => {
                    let _ = tx.send(TurnUpdate::Finished);
                }
                Err(error) => {
                    let _ = tx.send(TurnUpdate::Failed(format!("{error:#}")));
                }
            }
        });
    }

    fn apply_update(&mut self, update: TurnUpdate) {
        match update {
            TurnUpdate::Event(chat_event) => {
                self.timeline = fold(std::mem::take(&mut self.timeline), &chat_event);
                self.scroll_from_bottom = 0;
            }
            TurnUpdate::Failed(message) => {
                self.timeline = fold(
                    std::mem::take(&mut self.timeline),
                    &ChatEvent::Error { content: message },
                );
                self.sending = false;
                self.cancel = None;
                self.sessions_dirty = true;
                self.status = "turn failed".to_string();
            }
            TurnUpdate::Finished => {
                self.sending = false;
                self.cancel = None;
                self.sessions_dirty = true;
                self.status.clear();
            }
        }
    }

    fn cancel_turn(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
            self.status = "turn cancelled".to_string();
        }
    }

    async fn reload_sessions(&mut self) {
        self.sessions_dirty = false;
        match self.client.list_sessions().await {
            Ok(sessions) => self.sessions = sessions,
            Err(error) => self.status = format!("failed to reload sessions: {error:#}"),
        }
    }

    /// Switching sessions rebuilds the timeline from the persisted transcript;
    /// nothing is diffed against the previous session's items.
    async fn switch_session(&mut self, direction: isize) {
        if self.sending || self.sessions.is_empty() {
            return;
        }

        let current = self
            .sessions
            .iter()
            .position(|s| s.id == self.active_session_id)
            .unwrap_or(0);
        let count = self.sessions.len() as isize;
        let next = (current as isize + direction).rem_euclid(count) as usize;
        let session_id = self.sessions[next].id.clone();
        self.active_session_id = session_id.clone();
        self.load_session(&session_id).await;
    }

    async fn load_session(&mut self, session_id: &str) {
        match self.client.session_entries(session_id).await {
            Ok(entries) => {
                self.timeline = reconstruct(&entries);
                self.scroll_from_bottom = 0;
            }
            Err(error) => self.status = format!("failed to load session: {error:#}"),
        }
    }

    /// The backend materializes a session on first chat append, so a new
    /// session is purely a fresh local id and an empty timeline.
    fn new_session(&mut self) {
        if self.sending {
            return;
        }
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.active_session_id = format!("session-{seconds}");
        self.timeline.clear();
        self.input.clear();
        self.scroll_from_bottom = 0;
    }

    fn editor_path_options(&self) -> Vec<String> {
        let mut options: Vec<String> = FIXED_WORKSPACE_PATHS
            .iter()
            .map(|p| p.to_string())
            .collect();
        for path in &self.skill_paths {
            if !options.contains(path) {
                options.push(path.clone());
            }
        }
        options
    }

    async fn cycle_editor_path(&mut self) {
        let options = self.editor_path_options();
        if options.is_empty() {
            return;
        }
        self.editor_path_index = (self.editor_path_index + 1) % options.len();
        let path = options[self.editor_path_index].clone();
        if let Err(error) = self.editor.load(&self.client, &path).await {
            self.status = format!("failed to load {path}: {error:#}");
        }
    }

    fn draw(&mut self, terminal: &mut TerminalType) -> Result<()> {
        let lines = timeline_lines(&self.timeline);
        let session_id = self.active_session_id.clone();
        let session_count = self.sessions.len();
        let status = if self.status.is_empty() && self.sending {
            "streaming…".to_string()
        } else {
            self.status.clone()
        };

        terminal.draw(|frame| {
            let panes = split_deck_layout(frame.area(), self.editor_visible);
            render_session_bar(frame, panes.header, &session_id, session_count);
            render_timeline(frame, panes.history, &lines, self.scroll_from_bottom);
            if let Some(editor_area) = panes.editor {
                render_editor_panel(
                    frame,
                    editor_area,
                    &self.editor.selected_path,
                    &self.editor.content,
                    self.editor.dirty,
                );
            }
            render_input(frame, panes.input, &self.input);
            render_status_line(frame, panes.status, &status);
        })?;
        Ok(())
    }
}
