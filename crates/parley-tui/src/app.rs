use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use parley_core::{
    AssistantClient, Completion, ConversationController, Message, MessageId, Notification,
    NotificationLevel, OutgoingRequest, Role, render_markdown,
};
use ratatui::DefaultTerminal;
use ratatui::style::Style;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, warn};
use tui_textarea::{CursorMove, TextArea};

use crate::clipboard::{ClipboardWriter, SystemClipboard};
use crate::ui;

/// Tallest the input box grows before it scrolls
pub const MAX_INPUT_ROWS: u16 = 6;

/// What the input line is currently for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    Compose,
    Edit(MessageId),
    ConfirmDelete,
}

pub struct App {
    pub controller: ConversationController,
    client: Arc<dyn AssistantClient>,
    completion_tx: UnboundedSender<Completion>,
    completion_rx: UnboundedReceiver<Completion>,
    pub textarea: TextArea<'static>,
    pub mode: InputMode,
    pub status: Option<Notification>,
    /// Lines scrolled up from the bottom of the transcript
    pub scroll_back: u16,
    export_dir: PathBuf,
    share_base_url: String,
    clipboard: Box<dyn ClipboardWriter>,
    /// Last reply whose code blocks were copied, and how many so far
    code_copy: Option<(MessageId, usize)>,
    should_quit: bool,
}

impl App {
    pub fn new(
        controller: ConversationController,
        client: Arc<dyn AssistantClient>,
        export_dir: PathBuf,
        share_base_url: String,
    ) -> Self {
        let (completion_tx, completion_rx) = unbounded_channel();
        Self {
            controller,
            client,
            completion_tx,
            completion_rx,
            textarea: new_textarea(""),
            mode: InputMode::Compose,
            status: None,
            scroll_back: 0,
            export_dir,
            share_base_url,
            clipboard: Box::new(SystemClipboard),
            code_copy: None,
            should_quit: false,
        }
    }

    #[cfg(test)]
    pub fn with_clipboard(mut self, clipboard: impl ClipboardWriter + 'static) -> Self {
        self.clipboard = Box::new(clipboard);
        self
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    /// Rows the input box needs, capped at [`MAX_INPUT_ROWS`]
    pub fn input_rows(&self) -> u16 {
        (self.textarea.lines().len() as u16).clamp(1, MAX_INPUT_ROWS)
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Main loop: redraw, then wait for a key press or a finished request
    pub async fn run(mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let mut events = EventStream::new();

        while !self.should_quit {
            terminal.draw(|frame| ui::draw(frame, &self))?;

            tokio::select! {
                Some(completion) = self.completion_rx.recv() => {
                    self.on_completion(completion);
                }
                event = events.next() => match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
            }
        }

        Ok(())
    }

    pub fn on_completion(&mut self, completion: Completion) {
        let settlement = self
            .controller
            .complete_request(completion.ticket_id, completion.result);
        debug!(ticket_id = completion.ticket_id, ?settlement, "Request settled");
        self.scroll_back = 0;
        self.pull_notifications();
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.mode == InputMode::ConfirmDelete {
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                self.controller.delete_all_chats();
                self.pull_notifications();
            }
            self.mode = InputMode::Compose;
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let newline = key
            .modifiers
            .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT);
        let multiline = self.textarea.lines().len() > 1;
        match key.code {
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('n') if ctrl => {
                self.controller.create_new_chat();
                self.reset_input();
            }
            KeyCode::Char('d') if ctrl => self.mode = InputMode::ConfirmDelete,
            KeyCode::Char('r') if ctrl => {
                if let Some(outgoing) = self.controller.retry_last_message() {
                    self.spawn_request(outgoing);
                }
            }
            KeyCode::Char('l') if ctrl => {
                if let Some(id) = self.last_message_id(Role::Assistant) {
                    self.controller.like_message(&id);
                }
            }
            KeyCode::Char('k') if ctrl => {
                if let Some(id) = self.last_message_id(Role::Assistant) {
                    self.controller.dislike_message(&id);
                }
            }
            KeyCode::Char('e') if ctrl => self.start_edit(),
            KeyCode::Char('s') if ctrl => self.export_last_reply(),
            KeyCode::Char('y') if ctrl => self.copy_last_reply(),
            KeyCode::Char('g') if ctrl => self.copy_next_code_block(),
            KeyCode::Char('o') if ctrl => self.share_last_reply(),
            KeyCode::Char('t') if ctrl => {
                self.controller.toggle_theme();
            }
            KeyCode::Char('b') if ctrl => {
                self.controller.toggle_sidebar();
            }
            KeyCode::Esc => self.on_escape(),
            KeyCode::Up if !multiline => self.select_relative(-1),
            KeyCode::Down if !multiline => self.select_relative(1),
            KeyCode::PageUp => self.scroll_back = self.scroll_back.saturating_add(5),
            KeyCode::PageDown => self.scroll_back = self.scroll_back.saturating_sub(5),
            KeyCode::Enter if newline => self.textarea.insert_newline(),
            KeyCode::Enter => self.submit(),
            _ => {
                self.textarea.input(key);
            }
        }
        self.pull_notifications();
    }

    fn submit(&mut self) {
        let text = self.input_text();
        match self.mode.clone() {
            InputMode::Edit(id) => {
                if self.controller.edit_message(&id, &text) {
                    self.reset_input();
                }
            }
            InputMode::Compose => {
                if let Some(outgoing) = self.controller.send_message(&text) {
                    self.textarea = new_textarea("");
                    self.scroll_back = 0;
                    self.spawn_request(outgoing);
                }
            }
            InputMode::ConfirmDelete => {}
        }
    }

    fn on_escape(&mut self) {
        if matches!(self.mode, InputMode::Edit(_)) {
            self.reset_input();
        } else if self.controller.cancel_request() {
            self.status = Some(Notification::info("Request cancelled"));
        }
    }

    fn start_edit(&mut self) {
        let Some((id, content)) = self
            .last_message(Role::User)
            .map(|m| (m.id.clone(), m.content.clone()))
        else {
            return;
        };
        self.textarea = new_textarea(&content);
        self.mode = InputMode::Edit(id);
    }

    fn export_last_reply(&mut self) {
        let Some(id) = self.last_message_id(Role::Assistant) else {
            return;
        };
        if let Ok(path) = self.controller.export_message(&id, &self.export_dir) {
            self.pull_notifications();
            self.status = Some(Notification::success(format!(
                "Message downloaded as markdown! ({})",
                path.display()
            )));
        }
    }

    fn copy_last_reply(&mut self) {
        let Some(text) = self
            .last_message_id(Role::Assistant)
            .and_then(|id| self.controller.message_text(&id))
        else {
            return;
        };
        if self.copy(&text) {
            self.status = Some(Notification::success("Message copied to clipboard!"));
        }
    }

    /// Each press copies the next code block of the last reply, wrapping around
    fn copy_next_code_block(&mut self) {
        let Some(message) = self.last_message(Role::Assistant) else {
            return;
        };
        let id = message.id.clone();
        let rendered = render_markdown(&message.content, self.controller.theme());
        let blocks: Vec<String> = rendered
            .code_blocks()
            .into_iter()
            .map(|code| code.copy_text.clone())
            .collect();
        if blocks.is_empty() {
            self.status = Some(Notification::info("No code blocks in the last reply"));
            return;
        }

        let copied = match &self.code_copy {
            Some((last, count)) if *last == id => *count,
            _ => 0,
        };
        let index = copied % blocks.len();
        if self.copy(&blocks[index]) {
            self.code_copy = Some((id, copied + 1));
            self.status = Some(Notification::success(format!(
                "Code block {}/{} copied to clipboard!",
                index + 1,
                blocks.len()
            )));
        }
    }

    fn share_last_reply(&mut self) {
        let Some(link) = self
            .last_message_id(Role::Assistant)
            .and_then(|id| self.controller.share_link(&self.share_base_url, &id))
        else {
            return;
        };
        match self.clipboard.write(&link) {
            Ok(()) => {
                self.status = Some(Notification::success("Share link copied to clipboard!"));
            }
            Err(e) => {
                warn!(error = ?e, "Failed to copy share link");
                self.status = Some(Notification::info(link));
            }
        }
    }

    fn copy(&mut self, text: &str) -> bool {
        match self.clipboard.write(text) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = ?e, "Failed to copy to clipboard");
                self.status = Some(Notification::error("Failed to copy to clipboard"));
                false
            }
        }
    }

    fn select_relative(&mut self, delta: isize) {
        let chats = self.controller.chats();
        if chats.is_empty() {
            return;
        }
        let current = self
            .controller
            .current_chat_id()
            .and_then(|id| chats.iter().position(|c| &c.id == id));
        let target = match current {
            Some(index) => index.saturating_add_signed(delta).min(chats.len() - 1),
            None => 0,
        };
        if current != Some(target) {
            self.controller.select_chat(&chats[target].id);
            self.scroll_back = 0;
            if matches!(self.mode, InputMode::Edit(_)) {
                self.reset_input();
            }
        }
    }

    fn spawn_request(&self, outgoing: OutgoingRequest) {
        let client = Arc::clone(&self.client);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let completion = ConversationController::execute(client.as_ref(), outgoing).await;
            if tx.send(completion).is_err() {
                debug!("UI closed before the request completed");
            }
        });
    }

    fn reset_input(&mut self) {
        self.textarea = new_textarea("");
        self.mode = InputMode::Compose;
    }

    fn last_message(&self, role: Role) -> Option<&Message> {
        self.controller
            .current_chat()
            .and_then(|chat| chat.messages.iter().rev().find(|m| m.role == role))
    }

    fn last_message_id(&self, role: Role) -> Option<MessageId> {
        self.last_message(role).map(|m| m.id.clone())
    }

    /// Keep the most severe of the newest notifications for the status line
    fn pull_notifications(&mut self) {
        let notes = self.controller.drain_notifications();
        let chosen = notes
            .iter()
            .rev()
            .find(|n| n.level == NotificationLevel::Error)
            .or_else(|| notes.last());
        if let Some(note) = chosen {
            self.status = Some(note.clone());
        }
    }
}

fn new_textarea(text: &str) -> TextArea<'static> {
    let mut textarea = TextArea::from(text.lines().map(str::to_string));
    textarea.set_cursor_line_style(Style::default());
    textarea.set_placeholder_text("Send a message...");
    textarea.move_cursor(CursorMove::Bottom);
    textarea.move_cursor(CursorMove::End);
    textarea
}
