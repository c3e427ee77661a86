//! Mira Desktop — egui app state and UI.
//!
//! The app owns the config, the session store, and the rendered settings
//! form, and passes them by reference into the screen methods. Assistant
//! replies come through the [`AssistantBackend`] seam; Markdown replies are
//! rendered block-by-block via `lib::markdown`.

use eframe::egui;
use std::path::PathBuf;

use lib::backend::{AssistantBackend, LocalEchoBackend};
use lib::config::{self, AgentConfig};
use lib::form::{Control, SettingsForm};
use lib::markdown::{self, ContentBlock};
use lib::session::{SessionId, SessionMessage, SessionStore};

const SIDEBAR_WIDTH: f32 = 250.0;
const SIDEBAR_RECENT_LIMIT: usize = 8;
const CHAT_INPUT_HEIGHT: f32 = 96.0;
const CHAT_MESSAGES_MIN_HEIGHT: f32 = 80.0;

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    #[default]
    Chat,
    History,
    Settings,
}

/// Pending modal on the history screen.
enum HistoryDialog {
    Rename {
        session_id: SessionId,
        input: String,
        error: Option<String>,
    },
    Delete {
        session_id: SessionId,
        name: String,
    },
}

pub struct MiraApp {
    screen: Screen,
    config_path: PathBuf,
    store: SessionStore,
    backend: Box<dyn AssistantBackend>,

    active_session: Option<SessionId>,
    chat_input: String,
    chat_error: Option<String>,

    history_query: String,
    history_dialog: Option<HistoryDialog>,

    settings_form: SettingsForm,
    /// (is_error, text) status line under the settings buttons.
    settings_notice: Option<(bool, String)>,
}

impl MiraApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let config_path = config::default_config_path();
        let sessions_dir = config::default_sessions_dir();
        if let Err(e) = lib::init::init_data_dirs(&config_path, &sessions_dir) {
            log::error!("initializing data directories: {e:#}");
        }

        let (config, config_path) =
            config::load_config(Some(config_path)).unwrap_or_else(|e| {
                log::error!("loading config: {e:#}");
                (AgentConfig::default(), config::default_config_path())
            });
        let store = SessionStore::open(&sessions_dir).unwrap_or_else(|e| {
            log::error!("opening session store at {}: {e}", sessions_dir.display());
            let fallback = std::env::temp_dir().join("mira-sessions");
            SessionStore::open(&fallback).expect("opening fallback session store")
        });
        let settings_form = SettingsForm::render(&config);

        Self {
            screen: Screen::default(),
            config_path,
            store,
            backend: Box::new(LocalEchoBackend),
            active_session: None,
            chat_input: String::new(),
            chat_error: None,
            history_query: String::new(),
            history_dialog: None,
            settings_form,
            settings_notice: None,
        }
    }

    fn start_new_session(&mut self) {
        self.active_session = None;
        self.chat_input.clear();
        self.chat_error = None;
        self.screen = Screen::Chat;
    }

    /// Append the pending input as a user turn and run the backend for the
    /// assistant reply. The session is created lazily on the first message.
    fn run_chat_turn(&mut self) -> anyhow::Result<()> {
        let text = self.chat_input.trim().to_string();
        if text.is_empty() {
            return Ok(());
        }

        let session_id = match self.active_session.clone() {
            Some(id) => id,
            None => {
                let id = self.store.create(None)?;
                self.active_session = Some(id.clone());
                id
            }
        };

        self.store
            .append_message(&session_id, SessionMessage::user(text))?;
        self.chat_input.clear();

        let history = self
            .store
            .get(&session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default();
        let reply = self.backend.complete(&history)?;
        self.store
            .append_message(&session_id, SessionMessage::assistant(reply))?;
        Ok(())
    }

    fn send_message(&mut self) {
        self.chat_error = None;
        if let Err(e) = self.run_chat_turn() {
            log::error!("chat turn failed: {e:#}");
            self.chat_error = Some(format!("{e:#}"));
        }
    }

    /// Map one rendered Markdown block to widgets.
    fn content_block_ui(ui: &mut egui::Ui, block: &ContentBlock) {
        match block {
            ContentBlock::Text { text, bold, italic } => {
                let mut rich = egui::RichText::new(text);
                if *bold {
                    rich = rich.strong();
                }
                if *italic {
                    rich = rich.italics();
                }
                ui.add(egui::Label::new(rich).wrap(true));
            }
            ContentBlock::Code { code, language } => {
                egui::Frame::none()
                    .fill(ui.style().visuals.extreme_bg_color)
                    .rounding(egui::Rounding::same(6.0))
                    .inner_margin(egui::Margin::same(8.0))
                    .show(ui, |ui| {
                        if !language.is_empty() {
                            ui.label(egui::RichText::new(language).small().weak());
                        }
                        ui.add(
                            egui::Label::new(egui::RichText::new(code).monospace()).wrap(true),
                        );
                    });
            }
            ContentBlock::List { ordered, items } => {
                for (i, item) in items.iter().enumerate() {
                    ui.horizontal_wrapped(|ui| {
                        if *ordered {
                            ui.label(format!("{}.", i + 1));
                        } else {
                            ui.label("•");
                        }
                        ui.label(item);
                    });
                }
            }
        }
    }

    fn render_chat_message(ui: &mut egui::Ui, m: &SessionMessage) {
        let is_user = m.role == "user";
        let frame = egui::Frame::none()
            .fill(if is_user {
                ui.style().visuals.extreme_bg_color
            } else {
                ui.style().visuals.panel_fill
            })
            .stroke(egui::Stroke::new(
                1.0,
                ui.style().visuals.widgets.noninteractive.bg_stroke.color,
            ))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(8.0));

        frame.show(ui, |ui| {
            if is_user {
                ui.label(egui::RichText::new(&m.content).strong());
            } else {
                for block in markdown::render(&m.content) {
                    Self::content_block_ui(ui, &block);
                    ui.add_space(4.0);
                }
            }
        });
    }

    /// Chat screen: transcript (flexible, stick-to-bottom) above a fixed
    /// input and send row.
    fn ui_chat(&mut self, ui: &mut egui::Ui) {
        ui.add_space(8.0);
        let title = self
            .active_session
            .as_ref()
            .and_then(|id| self.store.get(id))
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "New chat".to_string());
        ui.heading(title);
        ui.add_space(8.0);

        let row_height = ui.spacing().interact_size.y + 8.0;
        let bottom_section = CHAT_INPUT_HEIGHT + 8.0 + row_height + 16.0;
        let messages_height =
            (ui.available_height() - bottom_section).max(CHAT_MESSAGES_MIN_HEIGHT);

        let messages: Vec<SessionMessage> = self
            .active_session
            .as_ref()
            .and_then(|id| self.store.get(id))
            .map(|s| s.messages.clone())
            .unwrap_or_default();

        egui::ScrollArea::vertical()
            .id_source("chat_messages")
            .stick_to_bottom(true)
            .max_height(messages_height)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if messages.is_empty() {
                    ui.add_space(24.0);
                    ui.vertical_centered(|ui| {
                        ui.label(
                            egui::RichText::new("Send a message to start the conversation.")
                                .weak(),
                        );
                    });
                }
                for m in &messages {
                    Self::render_chat_message(ui, m);
                    ui.add_space(8.0);
                }
            });

        ui.add_space(8.0);
        let input = ui.add_sized(
            [ui.available_width(), CHAT_INPUT_HEIGHT],
            egui::TextEdit::multiline(&mut self.chat_input).hint_text("Type a message…"),
        );
        ui.add_space(4.0);

        let mut send_now = false;
        ui.horizontal(|ui| {
            if ui.button("Send").clicked() {
                send_now = true;
            }
            if ui.button("/new").clicked() {
                self.start_new_session();
            }
            ui.label(egui::RichText::new("Ctrl+Enter to send").small().weak());
        });
        if input.has_focus() {
            let modifiers = ui.input(|i| i.modifiers);
            if (modifiers.command || modifiers.ctrl)
                && ui.input(|i| i.key_pressed(egui::Key::Enter))
            {
                send_now = true;
            }
        }
        if send_now {
            self.send_message();
        }

        if let Some(ref err) = self.chat_error {
            ui.add_space(4.0);
            ui.colored_label(egui::Color32::RED, err);
        }
    }

    /// History screen: searchable session list with open/rename/delete.
    fn ui_history(&mut self, ui: &mut egui::Ui) {
        ui.add_space(8.0);
        ui.heading("History");
        ui.add_space(8.0);

        ui.add(
            egui::TextEdit::singleline(&mut self.history_query)
                .hint_text("Search history")
                .desired_width(f32::INFINITY),
        );
        ui.add_space(8.0);

        let rows: Vec<(SessionId, String, String, usize)> = {
            let sessions = if self.history_query.trim().is_empty() {
                self.store.by_recency()
            } else {
                self.store.find_by_name_contains(&self.history_query)
            };
            sessions
                .iter()
                .map(|s| {
                    (
                        s.id.clone(),
                        s.name.clone(),
                        s.last_update_label(),
                        s.messages.len(),
                    )
                })
                .collect()
        };

        if rows.is_empty() {
            ui.add_space(32.0);
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new("No history yet").weak());
            });
            return;
        }

        egui::ScrollArea::vertical()
            .id_source("history_list")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (id, name, timestamp, message_count) in rows {
                    let frame = egui::Frame::none()
                        .fill(ui.style().visuals.panel_fill)
                        .stroke(egui::Stroke::new(
                            1.0,
                            ui.style().visuals.widgets.noninteractive.bg_stroke.color,
                        ))
                        .rounding(egui::Rounding::same(8.0))
                        .inner_margin(egui::Margin::same(8.0));
                    frame.show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.vertical(|ui| {
                                ui.label(egui::RichText::new(&name).strong());
                                ui.label(
                                    egui::RichText::new(format!(
                                        "{timestamp} · {message_count} message(s)"
                                    ))
                                    .small()
                                    .weak(),
                                );
                            });
                            ui.with_layout(
                                egui::Layout::right_to_left(egui::Align::Center),
                                |ui| {
                                    if ui.button("Delete").clicked() {
                                        self.history_dialog = Some(HistoryDialog::Delete {
                                            session_id: id.clone(),
                                            name: name.clone(),
                                        });
                                    }
                                    if ui.button("Rename").clicked() {
                                        self.history_dialog = Some(HistoryDialog::Rename {
                                            session_id: id.clone(),
                                            input: name.clone(),
                                            error: None,
                                        });
                                    }
                                    if ui.button("Open").clicked() {
                                        self.active_session = Some(id.clone());
                                        self.screen = Screen::Chat;
                                    }
                                },
                            );
                        });
                    });
                    ui.add_space(6.0);
                }
            });
    }

    /// Render the pending history dialog, if any, as a centered window.
    fn ui_history_dialog(&mut self, ctx: &egui::Context) {
        let Some(mut dialog) = self.history_dialog.take() else {
            return;
        };
        let mut keep_open = true;

        match &mut dialog {
            HistoryDialog::Rename {
                session_id,
                input,
                error,
            } => {
                egui::Window::new("Rename chat")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                    .show(ctx, |ui| {
                        ui.add(egui::TextEdit::singleline(input).desired_width(240.0));
                        if let Some(ref e) = error {
                            ui.colored_label(egui::Color32::RED, e);
                        }
                        ui.add_space(8.0);
                        ui.horizontal(|ui| {
                            if ui.button("Cancel").clicked() {
                                keep_open = false;
                            }
                            let name = input.trim().to_string();
                            if ui
                                .add_enabled(!name.is_empty(), egui::Button::new("Confirm"))
                                .clicked()
                            {
                                match self.store.rename(session_id, name) {
                                    Ok(()) => keep_open = false,
                                    Err(e) => *error = Some(e.to_string()),
                                }
                            }
                        });
                    });
            }
            HistoryDialog::Delete { session_id, name } => {
                egui::Window::new("Delete chat")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                    .show(ctx, |ui| {
                        ui.label(format!("Delete \"{name}\"? This cannot be undone."));
                        ui.add_space(8.0);
                        ui.horizontal(|ui| {
                            if ui.button("Cancel").clicked() {
                                keep_open = false;
                            }
                            if ui.button("Delete").clicked() {
                                match self.store.remove(session_id) {
                                    Ok(session) => {
                                        log::warn!("deleted session {}", session.id);
                                        if self.active_session.as_deref()
                                            == Some(session_id.as_str())
                                        {
                                            self.active_session = None;
                                        }
                                    }
                                    Err(e) => log::error!("deleting session: {e}"),
                                }
                                keep_open = false;
                            }
                        });
                    });
            }
        }

        if keep_open {
            self.history_dialog = Some(dialog);
        }
    }

    /// Map one form control to its widget.
    fn control_ui(ui: &mut egui::Ui, path: &str, control: &mut Control) {
        match control {
            Control::Switch { on } => {
                ui.add(egui::Checkbox::new(on, ""));
            }
            Control::Slider {
                value,
                min,
                max,
                integer,
            } => {
                let mut slider = egui::Slider::new(value, *min..=*max);
                if *integer {
                    slider = slider.integer();
                }
                ui.add(slider);
            }
            Control::NumericField { text } => {
                ui.add(egui::TextEdit::singleline(text).desired_width(90.0));
            }
            Control::TextField { text, masked } => {
                ui.add(
                    egui::TextEdit::singleline(text)
                        .password(*masked)
                        .desired_width(240.0),
                );
            }
            Control::List(editor) => {
                ui.vertical(|ui| {
                    let mut remove: Option<usize> = None;
                    for (i, row) in editor.rows.iter().enumerate() {
                        ui.horizontal(|ui| {
                            if ui.small_button("✖").clicked() {
                                remove = Some(i);
                            }
                            ui.label(row.display());
                        });
                    }
                    if let Some(i) = remove {
                        editor.remove_row(i);
                    }
                    ui.horizontal(|ui| {
                        ui.add(
                            egui::TextEdit::singleline(&mut editor.input)
                                .hint_text(format!("{} value", editor.element.label()))
                                .desired_width(180.0),
                        );
                        if ui.button("Add").clicked() && !editor.push_input() {
                            // Invalid input is a no-op; rows stay untouched.
                            log::debug!("ignoring invalid {} input for {path}", editor.element.label());
                        }
                    });
                });
            }
        }
    }

    /// Settings screen: generated sections plus save/reset/reload. Reset and
    /// reload rebuild the form wholesale from a fresh config instance.
    fn ui_settings(&mut self, ui: &mut egui::Ui) {
        ui.add_space(8.0);
        ui.heading("Settings");
        ui.add_space(8.0);

        egui::ScrollArea::vertical()
            .id_source("settings_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for section in self.settings_form.sections_mut() {
                    ui.add_space(12.0);
                    ui.label(egui::RichText::new(&section.title).strong().size(18.0));
                    ui.separator();
                    for item in &mut section.items {
                        egui::Frame::none()
                            .fill(ui.style().visuals.panel_fill)
                            .rounding(egui::Rounding::same(8.0))
                            .inner_margin(egui::Margin::same(8.0))
                            .show(ui, |ui| {
                                ui.horizontal(|ui| {
                                    ui.label(egui::RichText::new(&item.label).strong());
                                    ui.with_layout(
                                        egui::Layout::right_to_left(egui::Align::Center),
                                        |ui| {
                                            Self::control_ui(ui, &item.path, &mut item.control);
                                        },
                                    );
                                });
                                if !item.description.is_empty() {
                                    ui.label(
                                        egui::RichText::new(&item.description)
                                            .small()
                                            .weak()
                                            .italics(),
                                    );
                                }
                            });
                        ui.add_space(6.0);
                    }
                }

                ui.add_space(16.0);
                ui.horizontal(|ui| {
                    if ui.button("Save settings").clicked() {
                        self.save_settings();
                    }
                    if ui.button("Reset to defaults").clicked() {
                        self.settings_form = SettingsForm::render(&AgentConfig::default());
                        self.settings_notice =
                            Some((false, "Defaults loaded (not saved yet)".to_string()));
                    }
                    if ui.button("Reload from file").clicked() {
                        self.reload_settings();
                    }
                });
                if let Some((is_error, ref text)) = self.settings_notice {
                    ui.add_space(4.0);
                    if is_error {
                        ui.colored_label(egui::Color32::RED, text);
                    } else {
                        ui.label(egui::RichText::new(text).weak());
                    }
                }
            });
    }

    /// Validate the form values through serde and persist on success.
    fn save_settings(&mut self) {
        let values = self.settings_form.values();
        match serde_json::from_value::<AgentConfig>(serde_json::Value::Object(values)) {
            Ok(config) => match config::save_config(&config, &self.config_path) {
                Ok(()) => {
                    self.settings_form = SettingsForm::render(&config);
                    self.settings_notice = Some((false, "Settings saved".to_string()));
                }
                Err(e) => {
                    log::error!("saving config: {e:#}");
                    self.settings_notice = Some((true, format!("Saving failed: {e:#}")));
                }
            },
            Err(e) => {
                self.settings_notice = Some((true, format!("Invalid settings: {e}")));
            }
        }
    }

    fn reload_settings(&mut self) {
        match config::load_config(Some(self.config_path.clone())) {
            Ok((config, _)) => {
                self.settings_form = SettingsForm::render(&config);
                self.settings_notice = Some((false, "Reloaded from file".to_string()));
            }
            Err(e) => {
                log::error!("reloading config: {e:#}");
                self.settings_notice = Some((true, format!("Reload failed: {e:#}")));
            }
        }
    }

    fn ui_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("🤖").size(20.0));
            ui.label(egui::RichText::new("Mira").strong().size(18.0));
        });
        ui.separator();

        if ui.button("➕ New chat").clicked() {
            self.start_new_session();
        }
        ui.add_space(12.0);

        ui.label(egui::RichText::new("Recent").small().weak());
        let recent: Vec<(SessionId, String)> = self
            .store
            .by_recency()
            .iter()
            .take(SIDEBAR_RECENT_LIMIT)
            .map(|s| (s.id.clone(), s.name.clone()))
            .collect();
        for (id, name) in recent {
            let selected = self.screen == Screen::Chat
                && self.active_session.as_deref() == Some(id.as_str());
            if ui.selectable_label(selected, name).clicked() {
                self.active_session = Some(id);
                self.screen = Screen::Chat;
            }
        }

        ui.add_space(12.0);
        ui.separator();
        if ui
            .selectable_label(self.screen == Screen::History, "🕘 History")
            .clicked()
        {
            self.screen = Screen::History;
        }
        if ui
            .selectable_label(self.screen == Screen::Settings, "⚙ Settings")
            .clicked()
        {
            self.screen = Screen::Settings;
        }
    }
}

impl eframe::App for MiraApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::SidePanel::left("sidebar")
            .exact_width(SIDEBAR_WIDTH)
            .resizable(false)
            .show(ctx, |ui| self.ui_sidebar(ui));

        egui::CentralPanel::default().show(ctx, |ui| match self.screen {
            Screen::Chat => self.ui_chat(ui),
            Screen::History => self.ui_history(ui),
            Screen::Settings => self.ui_settings(ui),
        });

        self.ui_history_dialog(ctx);
    }
}
