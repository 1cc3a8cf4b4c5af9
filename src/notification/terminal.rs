//! Line-oriented console presenter.
//!
//! Prints to stdout so it can share the terminal with the operator's
//! command input; logs go to stderr.

use std::io::{self, Write};
use std::sync::Mutex;

use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};

use super::banner::{Banner, Level};
use super::Presenter;
use crate::config::Theme;
use crate::hitl::countdown::{Urgency, CRITICAL_SECS};
use crate::hitl::dispatch::{Effect, PromptView};
use crate::models::hitl::{CallInfo, HitlStatus, TaskId};

/// Foreground colors for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub info: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub urgent: Color,
    pub muted: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                info: Color::DarkBlue,
                success: Color::DarkGreen,
                warning: Color::DarkYellow,
                error: Color::DarkRed,
                urgent: Color::DarkMagenta,
                muted: Color::DarkGrey,
            },
            Theme::Dark => Self {
                info: Color::Cyan,
                success: Color::Green,
                warning: Color::Yellow,
                error: Color::Red,
                urgent: Color::Magenta,
                muted: Color::Grey,
            },
        }
    }

    fn level(&self, level: Level) -> Color {
        match level {
            Level::Info => self.info,
            Level::Success => self.success,
            Level::Warning => self.warning,
            Level::Error => self.error,
            Level::Urgent => self.urgent,
        }
    }

    fn urgency(&self, urgency: Urgency) -> Color {
        match urgency {
            Urgency::Normal => self.muted,
            Urgency::Warning => self.warning,
            Urgency::Critical => self.error,
        }
    }
}

pub struct TerminalPresenter {
    palette: Palette,
    modal: Mutex<Option<TaskId>>,
}

impl TerminalPresenter {
    pub fn new(theme: Theme) -> Self {
        Self {
            palette: Palette::for_theme(theme),
            modal: Mutex::new(None),
        }
    }

    fn is_modal(&self, task_id: &TaskId) -> bool {
        self.modal
            .lock()
            .map(|m| m.as_ref() == Some(task_id))
            .unwrap_or(false)
    }

    fn write_line(&self, color: Color, bold: bool, text: &str) {
        let mut out = io::stdout().lock();
        let _ = styled_line(&mut out, color, bold, text);
    }

    fn write_prompt(&self, view: &PromptView, refreshed: bool) {
        let lines = prompt_lines(view);
        let tag = if refreshed { " (updated)" } else { "" };
        self.write_line(self.palette.urgent, true, &format!("{}{}", lines[0], tag));
        for line in &lines[1..] {
            self.write_line(self.palette.info, false, line);
        }
    }
}

impl Presenter for TerminalPresenter {
    fn render(&self, effect: &Effect) {
        match effect {
            Effect::ShowPrompt(view) => self.write_prompt(view, false),
            Effect::RefreshPrompt(view) => self.write_prompt(view, true),
            Effect::Countdown { task_id, reading } => {
                if self.is_modal(task_id) && announce_countdown(reading.remaining) {
                    self.write_line(
                        self.palette.urgency(reading.urgency),
                        reading.urgency == Urgency::Critical,
                        &format!("  #{}: {}s remaining", task_id, reading.remaining),
                    );
                }
            }
            Effect::RemovePrompt { task_id, status } => {
                self.write_line(self.palette.muted, false, &removal_line(task_id, *status));
            }
            Effect::ModalChanged(current) => {
                if let Ok(mut modal) = self.modal.lock() {
                    *modal = current.clone();
                }
                if let Some(id) = current {
                    self.write_line(
                        self.palette.urgent,
                        false,
                        &format!("> answering #{} (type a reply, or /dismiss {})", id, id),
                    );
                }
            }
            Effect::SurfaceVisible(false) => {
                self.write_line(self.palette.muted, false, "No pending requests.");
            }
            Effect::SurfaceVisible(true) | Effect::FocusInput(_) => {}
            Effect::Notify(_) | Effect::SendResponse { .. } => {}
        }
    }

    fn banner_shown(&self, banner: &Banner) {
        self.write_line(
            self.palette.level(banner.level),
            banner.level == Level::Urgent,
            &banner_line(banner),
        );
    }
}

fn styled_line(out: &mut impl Write, color: Color, bold: bool, text: &str) -> io::Result<()> {
    queue!(out, SetForegroundColor(color))?;
    if bold {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    queue!(
        out,
        Print(text),
        SetAttribute(Attribute::Reset),
        ResetColor,
        Print("\n")
    )?;
    out.flush()
}

/// Header, question and countdown lines for a prompt.
pub fn prompt_lines(view: &PromptView) -> Vec<String> {
    vec![
        format!("[HITL #{}] {}", view.task_id, describe_call(&view.call_info)),
        format!("  Q: {}", view.question),
        format!("  {}s to answer", view.remaining),
    ]
}

pub fn describe_call(info: &CallInfo) -> String {
    let person = info.person_name.as_deref().unwrap_or("Unknown");
    let phone = info.phone_number.as_deref().unwrap_or("Unknown");
    match info.business_name.as_deref() {
        Some(business) => format!("{} ({}) at {}", person, phone, business),
        None => format!("{} ({})", person, phone),
    }
}

pub fn banner_line(banner: &Banner) -> String {
    let label = match banner.level {
        Level::Info => "info",
        Level::Success => "ok",
        Level::Warning => "warn",
        Level::Error => "error",
        Level::Urgent => "URGENT",
    };
    if banner.level.auto_expires() {
        format!("[{}] {}", label, banner.message)
    } else {
        // Sticky banners carry their id for `/close`.
        format!("[{} #{}] {}", label, banner.id, banner.message)
    }
}

fn removal_line(task_id: &TaskId, status: HitlStatus) -> String {
    let what = match status {
        HitlStatus::Answered => "answered",
        HitlStatus::TimedOut => "timed out",
        HitlStatus::Dismissed => "dismissed",
        HitlStatus::Pending => "closed",
    };
    format!("[HITL #{}] {}", task_id, what)
}

/// Print every tenth second, then every second once critical.
fn announce_countdown(remaining: u64) -> bool {
    remaining <= CRITICAL_SECS || remaining % 10 == 0
}
