use std::{fmt, str::FromStr};

use colored::*;
use thiserror::Error;

use crate::models::{
    ProjectId, TaskId, TimeEntryId,
    task::{ParseTaskStatusError, TaskStatus},
    tray::TrayMenuData,
};

/// Messages the shell pushes to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellEvent {
    ShowPreferences,
    FocusTaskCreation,
    OpenProject(ProjectId),
    UpdateTaskStatus(TaskId, TaskStatus),
    StartTaskTimer(TaskId),
    /// `None` when the tray had no running timer to hand over
    StopTimer(Option<TimeEntryId>),
    ViewTaskDetails(TaskId),
    AddTaskToProject(ProjectId),
}

#[derive(Debug, Error, PartialEq)]
pub enum ShellEventError {
    #[error("Unknown event channel '{0}'")]
    UnknownChannel(String),

    #[error("Event '{channel}' expects {expected} argument(s), got {got}")]
    WrongArity {
        channel: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid id '{0}'")]
    InvalidId(String),

    #[error(transparent)]
    InvalidStatus(#[from] ParseTaskStatusError),
}

fn parse_id(value: &str) -> Result<u64, ShellEventError> {
    value
        .trim()
        .parse()
        .map_err(|_| ShellEventError::InvalidId(value.to_string()))
}

impl ShellEvent {
    pub fn parse(channel: &str, args: &[String]) -> Result<Self, ShellEventError> {
        let event = match channel {
            "show-preferences" => ShellEvent::ShowPreferences,
            "focus-task-creation" => ShellEvent::FocusTaskCreation,
            "open-project" => ShellEvent::OpenProject(parse_id(one_arg("open-project", args)?)?),
            "update-task-status" => match args {
                [task_id, status] => {
                    ShellEvent::UpdateTaskStatus(parse_id(task_id)?, status.parse()?)
                }
                _ => {
                    return Err(ShellEventError::WrongArity {
                        channel: "update-task-status",
                        expected: 2,
                        got: args.len(),
                    });
                }
            },
            "start-task-timer" => {
                ShellEvent::StartTaskTimer(parse_id(one_arg("start-task-timer", args)?)?)
            }
            "stop-timer" => match args {
                [] => ShellEvent::StopTimer(None),
                [id] => ShellEvent::StopTimer(Some(parse_id(id)?)),
                _ => {
                    return Err(ShellEventError::WrongArity {
                        channel: "stop-timer",
                        expected: 1,
                        got: args.len(),
                    });
                }
            },
            "view-task-details" => {
                ShellEvent::ViewTaskDetails(parse_id(one_arg("view-task-details", args)?)?)
            }
            "add-task-to-project" => {
                ShellEvent::AddTaskToProject(parse_id(one_arg("add-task-to-project", args)?)?)
            }
            other => return Err(ShellEventError::UnknownChannel(other.to_string())),
        };
        Ok(event)
    }

    pub fn channel(&self) -> &'static str {
        match self {
            ShellEvent::ShowPreferences => "show-preferences",
            ShellEvent::FocusTaskCreation => "focus-task-creation",
            ShellEvent::OpenProject(_) => "open-project",
            ShellEvent::UpdateTaskStatus(..) => "update-task-status",
            ShellEvent::StartTaskTimer(_) => "start-task-timer",
            ShellEvent::StopTimer(_) => "stop-timer",
            ShellEvent::ViewTaskDetails(_) => "view-task-details",
            ShellEvent::AddTaskToProject(_) => "add-task-to-project",
        }
    }
}

fn one_arg<'a>(channel: &'static str, args: &'a [String]) -> Result<&'a str, ShellEventError> {
    match args {
        [value] => Ok(value),
        _ => Err(ShellEventError::WrongArity {
            channel,
            expected: 1,
            got: args.len(),
        }),
    }
}

/// Calls the client makes into the shell.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellRequest {
    Ping,
    GetBackendUrl,
    MinimizeWindow,
    MaximizeWindow,
    CloseWindow,
    ShowInTray,
    HideFromTray,
    UpdateTrayMenu(Box<TrayMenuData>),
    ShowNotification { title: String, body: String },
    GetGlobalShortcut,
}

impl ShellRequest {
    pub fn channel(&self) -> &'static str {
        match self {
            ShellRequest::Ping => "ping",
            ShellRequest::GetBackendUrl => "get-backend-url",
            ShellRequest::MinimizeWindow => "minimize-window",
            ShellRequest::MaximizeWindow => "maximize-window",
            ShellRequest::CloseWindow => "close-window",
            ShellRequest::ShowInTray => "show-in-tray",
            ShellRequest::HideFromTray => "hide-from-tray",
            ShellRequest::UpdateTrayMenu(_) => "update-tray-menu",
            ShellRequest::ShowNotification { .. } => "show-notification",
            ShellRequest::GetGlobalShortcut => "get-global-shortcut",
        }
    }
}

impl FromStr for ShellRequest {
    type Err = ShellEventError;

    /// Parses the argument-less requests.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ping" => Ok(ShellRequest::Ping),
            "get-backend-url" => Ok(ShellRequest::GetBackendUrl),
            "minimize-window" => Ok(ShellRequest::MinimizeWindow),
            "maximize-window" => Ok(ShellRequest::MaximizeWindow),
            "close-window" => Ok(ShellRequest::CloseWindow),
            "show-in-tray" => Ok(ShellRequest::ShowInTray),
            "hide-from-tray" => Ok(ShellRequest::HideFromTray),
            "get-global-shortcut" => Ok(ShellRequest::GetGlobalShortcut),
            other => Err(ShellEventError::UnknownChannel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShellResponse {
    Done,
    Text(String),
}

impl fmt::Display for ShellResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellResponse::Done => f.write_str("ok"),
            ShellResponse::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Failed to encode tray menu: {0}")]
    TrayPayload(#[from] serde_json::Error),
}

pub trait Shell {
    fn request(&mut self, request: ShellRequest) -> Result<ShellResponse, ShellError>;

    fn notify(&mut self, title: &str, body: &str) -> Result<(), ShellError> {
        self.request(ShellRequest::ShowNotification {
            title: title.to_string(),
            body: body.to_string(),
        })
        .map(|_| ())
    }

    fn update_tray_menu(&mut self, data: TrayMenuData) -> Result<(), ShellError> {
        self.request(ShellRequest::UpdateTrayMenu(Box::new(data)))
            .map(|_| ())
    }
}

pub fn global_shortcut() -> &'static str {
    if cfg!(target_os = "macos") {
        "Cmd+Shift+T"
    } else {
        "Ctrl+Shift+T"
    }
}

/// Shell for the command line: notifications go to stdout, there is no window.
pub struct TerminalShell {
    backend_url: String,
}

impl TerminalShell {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
        }
    }
}

impl Shell for TerminalShell {
    fn request(&mut self, request: ShellRequest) -> Result<ShellResponse, ShellError> {
        match request {
            ShellRequest::Ping => Ok(ShellResponse::Text("pong".to_string())),
            ShellRequest::GetBackendUrl => Ok(ShellResponse::Text(self.backend_url.clone())),
            ShellRequest::GetGlobalShortcut => {
                Ok(ShellResponse::Text(global_shortcut().to_string()))
            }
            ShellRequest::ShowNotification { title, body } => {
                println!("{} {}", format!("{title}:").bold(), body);
                Ok(ShellResponse::Done)
            }
            ShellRequest::UpdateTrayMenu(data) => {
                let payload = serde_json::to_string(&data)?;
                log::debug!("update-tray-menu {payload}");
                Ok(ShellResponse::Done)
            }
            window @ (ShellRequest::MinimizeWindow
            | ShellRequest::MaximizeWindow
            | ShellRequest::CloseWindow
            | ShellRequest::ShowInTray
            | ShellRequest::HideFromTray) => {
                log::info!("{} has no effect in a terminal", window.channel());
                Ok(ShellResponse::Done)
            }
        }
    }
}
