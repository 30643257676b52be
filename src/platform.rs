//! Platform collaborator: native dialogs, clipboard, shell, notifications
//! and menus.
//!
//! The host never talks to the OS directly for these; built-in services
//! call a [`Platform`] implementation instead. [`HeadlessPlatform`] keeps
//! everything in memory and answers dialogs from a script, which is what
//! tests and headless runs use.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::api::{
    ClipboardImage, DialogShowMessage, DialogShowOpen, DialogShowSave, MenuItem, MenuShowContext,
    MessageBoxResult, NotificationShow, OpenDialogResult, SaveDialogResult,
};
use crate::error::{BridgeError, Result};
use crate::protocol::WindowId;

/// Native services the host delegates to.
#[async_trait]
pub trait Platform: Send + Sync + 'static {
    async fn show_open_dialog(
        &self,
        window: WindowId,
        options: &DialogShowOpen,
    ) -> Result<OpenDialogResult>;

    async fn show_save_dialog(
        &self,
        window: WindowId,
        options: &DialogShowSave,
    ) -> Result<SaveDialogResult>;

    async fn show_message_box(
        &self,
        window: WindowId,
        options: &DialogShowMessage,
    ) -> Result<MessageBoxResult>;

    async fn read_clipboard_text(&self) -> Result<String>;

    async fn write_clipboard_text(&self, text: &str) -> Result<()>;

    async fn read_clipboard_image(&self) -> Result<Option<ClipboardImage>>;

    async fn write_clipboard_image(&self, image: &ClipboardImage) -> Result<()>;

    async fn open_external(&self, url: &Url) -> Result<()>;

    async fn open_path(&self, path: &Path) -> Result<()>;

    async fn show_item_in_folder(&self, path: &Path) -> Result<()>;

    async fn show_notification(&self, notification: &NotificationShow) -> Result<()>;

    /// Returns the chosen item id, `None` when dismissed.
    async fn show_context_menu(
        &self,
        window: WindowId,
        menu: &MenuShowContext,
    ) -> Result<Option<String>>;

    async fn set_application_menu(&self, items: &[MenuItem]) -> Result<()>;
}

#[derive(Default)]
struct HeadlessState {
    clipboard_text: String,
    clipboard_image: Option<ClipboardImage>,
    opened: Vec<String>,
    revealed: Vec<PathBuf>,
    notifications: Vec<NotificationShow>,
    application_menu: Vec<MenuItem>,
    open_answers: VecDeque<OpenDialogResult>,
    save_answers: VecDeque<SaveDialogResult>,
    message_answers: VecDeque<usize>,
    context_answers: VecDeque<Option<String>>,
}

/// In-memory platform with scripted dialog answers.
///
/// Unscripted dialogs answer as if the user cancelled.
#[derive(Default)]
pub struct HeadlessPlatform {
    state: Mutex<HeadlessState>,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next open dialog with `result`.
    pub fn queue_open_dialog(&self, result: OpenDialogResult) {
        self.state.lock().open_answers.push_back(result);
    }

    /// Answer the next save dialog with `result`.
    pub fn queue_save_dialog(&self, result: SaveDialogResult) {
        self.state.lock().save_answers.push_back(result);
    }

    /// Answer the next message box by clicking button `index`.
    pub fn queue_message_response(&self, index: usize) {
        self.state.lock().message_answers.push_back(index);
    }

    /// Answer the next context menu by picking `id` (or dismissing).
    pub fn queue_context_menu_choice(&self, id: Option<&str>) {
        self.state
            .lock()
            .context_answers
            .push_back(id.map(str::to_string));
    }

    /// URLs and paths handed to the OS, in order.
    pub fn opened(&self) -> Vec<String> {
        self.state.lock().opened.clone()
    }

    /// Paths revealed with `show_item_in_folder`.
    pub fn revealed(&self) -> Vec<PathBuf> {
        self.state.lock().revealed.clone()
    }

    pub fn notifications(&self) -> Vec<NotificationShow> {
        self.state.lock().notifications.clone()
    }

    pub fn application_menu(&self) -> Vec<MenuItem> {
        self.state.lock().application_menu.clone()
    }
}

#[async_trait]
impl Platform for HeadlessPlatform {
    async fn show_open_dialog(
        &self,
        _window: WindowId,
        _options: &DialogShowOpen,
    ) -> Result<OpenDialogResult> {
        Ok(self
            .state
            .lock()
            .open_answers
            .pop_front()
            .unwrap_or(OpenDialogResult {
                canceled: true,
                file_paths: Vec::new(),
            }))
    }

    async fn show_save_dialog(
        &self,
        _window: WindowId,
        _options: &DialogShowSave,
    ) -> Result<SaveDialogResult> {
        Ok(self
            .state
            .lock()
            .save_answers
            .pop_front()
            .unwrap_or(SaveDialogResult {
                canceled: true,
                file_path: None,
            }))
    }

    async fn show_message_box(
        &self,
        _window: WindowId,
        options: &DialogShowMessage,
    ) -> Result<MessageBoxResult> {
        let response = self.state.lock().message_answers.pop_front().unwrap_or(0);
        if !options.buttons.is_empty() && response >= options.buttons.len() {
            return Err(BridgeError::Platform(format!(
                "button {response} out of range for {} buttons",
                options.buttons.len()
            )));
        }
        Ok(MessageBoxResult { response })
    }

    async fn read_clipboard_text(&self) -> Result<String> {
        Ok(self.state.lock().clipboard_text.clone())
    }

    async fn write_clipboard_text(&self, text: &str) -> Result<()> {
        self.state.lock().clipboard_text = text.to_string();
        Ok(())
    }

    async fn read_clipboard_image(&self) -> Result<Option<ClipboardImage>> {
        Ok(self.state.lock().clipboard_image.clone())
    }

    async fn write_clipboard_image(&self, image: &ClipboardImage) -> Result<()> {
        self.state.lock().clipboard_image = Some(image.clone());
        Ok(())
    }

    async fn open_external(&self, url: &Url) -> Result<()> {
        self.state.lock().opened.push(url.to_string());
        Ok(())
    }

    async fn open_path(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(BridgeError::Platform(format!(
                "path does not exist: {}",
                path.display()
            )));
        }
        self.state.lock().opened.push(path.display().to_string());
        Ok(())
    }

    async fn show_item_in_folder(&self, path: &Path) -> Result<()> {
        self.state.lock().revealed.push(path.to_path_buf());
        Ok(())
    }

    async fn show_notification(&self, notification: &NotificationShow) -> Result<()> {
        tracing::info!(title = %notification.title, "notification");
        self.state.lock().notifications.push(notification.clone());
        Ok(())
    }

    async fn show_context_menu(
        &self,
        _window: WindowId,
        menu: &MenuShowContext,
    ) -> Result<Option<String>> {
        let choice = self.state.lock().context_answers.pop_front().flatten();
        match choice {
            Some(id) if !menu.items.iter().any(|item| item.find(&id).is_some()) => Err(
                BridgeError::Platform(format!("menu has no item '{id}'")),
            ),
            other => Ok(other),
        }
    }

    async fn set_application_menu(&self, items: &[MenuItem]) -> Result<()> {
        self.state.lock().application_menu = items.to_vec();
        Ok(())
    }
}
