use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::models::{ProjectId, ValidationError, check_length, empty_as_none, non_empty};

pub const DEFAULT_COLORS: [&str; 10] = [
    "#007AFF", "#5856D6", "#AF52DE", "#FF2D92", "#FF3B30", "#FF9500", "#FFCC02", "#34C759",
    "#00C7BE", "#5AC8FA",
];

pub const DEFAULT_ICONS: [&str; 20] = [
    "clipboard",
    "note",
    "briefcase",
    "target",
    "bolt",
    "fire",
    "lightbulb",
    "rocket",
    "star",
    "gem",
    "trophy",
    "palette",
    "wrench",
    "chart-bar",
    "chart-line",
    "music",
    "gamepad",
    "running",
    "pizza",
    "coffee",
];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    /// Backend identifier of the project
    pub id: ProjectId,
    /// Name of the project
    pub name: String,
    /// Free-form description of the project
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    /// Display color as #RRGGBB
    pub color: String,
    /// Icon identifier, see `DEFAULT_ICONS`
    pub icon: String,
    /// Created at timestamp of the project
    pub created_at: Timestamp,
    /// Updated at timestamp of the project
    pub updated_at: Timestamp,
}

impl Project {
    pub fn icon_emoji(&self) -> &str {
        icon_emoji(&self.icon)
    }
}

/// A project as returned by the counting listing endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectWithCount {
    #[serde(flatten)]
    pub project: Project,
    #[serde(default)]
    pub task_count: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewProject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
}

impl NewProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            color: DEFAULT_COLORS[0].to_string(),
            icon: DEFAULT_ICONS[0].to_string(),
        }
    }

    /// Trims the free-text fields and checks them against the backend limits.
    pub fn validated(self) -> Result<Self, ValidationError> {
        check_length("Project name", &self.name, 100, true)?;
        if let Some(description) = &self.description {
            check_length("Description", description, 500, false)?;
        }
        check_color(&self.color)?;
        check_length("Icon", &self.icon, 50, true)?;

        Ok(Self {
            name: self.name.trim().to_string(),
            description: non_empty(self.description),
            color: self.color,
            icon: self.icon.trim().to_string(),
        })
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ProjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ProjectUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.icon.is_none()
    }

    pub fn validated(self) -> Result<Self, ValidationError> {
        if let Some(name) = &self.name {
            check_length("Project name", name, 100, true)?;
        }
        if let Some(description) = &self.description {
            check_length("Description", description, 500, false)?;
        }
        if let Some(color) = &self.color {
            check_color(color)?;
        }
        if let Some(icon) = &self.icon {
            check_length("Icon", icon, 50, true)?;
        }

        Ok(Self {
            name: self.name.map(|n| n.trim().to_string()),
            // An explicit empty description clears it on the backend
            description: self.description.map(|d| d.trim().to_string()),
            color: self.color,
            icon: self.icon.map(|i| i.trim().to_string()),
        })
    }
}

fn check_color(color: &str) -> Result<(), ValidationError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidColor(color.to_string()))
    }
}

/// Map an icon identifier to the emoji shown next to the project name.
/// Unknown identifiers are displayed as-is.
pub fn icon_emoji(icon: &str) -> &str {
    match icon {
        "clipboard" => "📋",
        "note" => "📝",
        "briefcase" => "💼",
        "target" => "🎯",
        "bolt" => "⚡",
        "fire" => "🔥",
        "lightbulb" => "💡",
        "rocket" => "🚀",
        "star" => "⭐",
        "gem" => "💎",
        "trophy" => "🏆",
        "palette" => "🎨",
        "wrench" => "🔧",
        "chart-bar" => "📊",
        "chart-line" => "📈",
        "music" => "🎵",
        "gamepad" => "🎮",
        "running" => "🏃",
        "pizza" => "🍕",
        "coffee" => "☕",
        other => other,
    }
}
