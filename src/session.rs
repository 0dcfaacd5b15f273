use std::path::PathBuf;

use jiff::{civil::Date, tz::TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    models::{
        ProjectId, TaskId,
        store::{Action, Store, TrayMenuCollapsed, TraySection},
    },
    timeline::Week,
};

pub mod json;

pub const CURRENT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to load session from '{path}': {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON from '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to save session to '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize session to JSON: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "Session file was written by a newer version of focused-todo (version {0}). Please upgrade to use it."
    )]
    FutureVersion(u32),
}

/// UI state that outlives a single invocation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(default)]
    pub active_project_id: Option<ProjectId>,
    #[serde(default)]
    pub selected_task_id: Option<TaskId>,
    #[serde(default)]
    pub tray_menu_collapsed: TrayMenuCollapsed,
    /// First day of the week the timeline was last showing
    #[serde(default)]
    pub week_start: Option<Date>,
    /// Project the timeline was last showing
    #[serde(default)]
    pub timeline_project_id: Option<ProjectId>,
}

fn first_version() -> u32 {
    1
}

impl Default for Session {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            active_project_id: None,
            selected_task_id: None,
            tray_menu_collapsed: TrayMenuCollapsed::default(),
            week_start: None,
            timeline_project_id: None,
        }
    }
}

impl Session {
    /// Replays the saved flags into a store whose projects are already loaded.
    pub fn restore(&self, store: &mut Store) {
        if let Some(project_id) = self.active_project_id {
            match store.get_project(project_id).cloned() {
                Some(project) => store.dispatch(Action::SetActiveProject(Some(project))),
                None => log::debug!("Active project {project_id} no longer exists"),
            }
        }

        store.dispatch(Action::SetSelectedTask(self.selected_task_id));

        for section in TraySection::ALL {
            if store.tray_menu_collapsed.get(section) != self.tray_menu_collapsed.get(section) {
                store.dispatch(Action::ToggleTrayMenuSection(section));
            }
        }
    }

    pub fn capture(&mut self, store: &Store) {
        self.active_project_id = store.active_project.as_ref().map(|p| p.id);
        self.selected_task_id = store.selected_task_id;
        self.tray_menu_collapsed = store.tray_menu_collapsed;
    }

    /// The week the timeline should open on.
    pub fn week(&self, tz: TimeZone) -> Week {
        match self.week_start {
            Some(start) => Week::containing(start, tz),
            None => Week::current(tz),
        }
    }

    pub fn set_week(&mut self, week: &Week) {
        self.week_start = Some(week.first_day());
    }
}

pub trait SessionStorage {
    fn load(&self) -> Result<Session, SessionError>;
    fn save(&self, session: &Session) -> Result<(), SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::store::fixtures::project;

    #[test]
    fn test_restore_then_capture() {
        let mut store = Store::default();
        store.dispatch(Action::SetProjects(vec![project(1, "Work"), project(2, "Home")]));

        let session = Session {
            active_project_id: Some(2),
            selected_task_id: Some(7),
            tray_menu_collapsed: TrayMenuCollapsed {
                recent_tasks: true,
                ..TrayMenuCollapsed::default()
            },
            ..Session::default()
        };
        session.restore(&mut store);

        assert_eq!(store.active_project.as_ref().map(|p| p.id), Some(2));
        assert_eq!(store.selected_task_id, Some(7));
        assert!(store.tray_menu_collapsed.recent_tasks);
        assert!(!store.tray_menu_collapsed.time_tracking);

        store.dispatch(Action::ToggleTrayMenuSection(TraySection::TimeTracking));
        store.dispatch(Action::SetActiveProject(None));

        let mut captured = session.clone();
        captured.capture(&store);
        assert_eq!(captured.active_project_id, None);
        assert!(captured.tray_menu_collapsed.time_tracking);
        assert!(captured.tray_menu_collapsed.recent_tasks);
    }

    #[test]
    fn test_restore_skips_deleted_project() {
        let mut store = Store::default();
        let session = Session {
            active_project_id: Some(9),
            ..Session::default()
        };

        session.restore(&mut store);

        assert_eq!(store.active_project, None);
    }

    #[test]
    fn test_week_defaults_to_current_and_remembers_start() {
        let mut session = Session::default();
        let current = session.week(TimeZone::UTC);
        assert_eq!(
            current.first_day(),
            Week::current(TimeZone::UTC).first_day()
        );

        let week = Week::containing("2024-03-06".parse().unwrap(), TimeZone::UTC);
        session.set_week(&week);
        assert_eq!(session.week_start, Some("2024-03-03".parse().unwrap()));
        assert_eq!(session.week(TimeZone::UTC).first_day(), week.first_day());
    }
}
