use std::{
    fs::{self, OpenOptions, rename, write},
    path::PathBuf,
};

use fs2::FileExt;
use serde_json::to_string_pretty;
use uuid::Uuid;

use crate::session::{CURRENT_VERSION, Session, SessionError, SessionStorage};

pub struct JsonFileSession {
    path: PathBuf,
}

impl JsonFileSession {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn ensure_parent_dir(&self) -> Result<(), SessionError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| SessionError::SaveFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })
            }
            _ => Ok(()),
        }
    }
}

impl SessionStorage for JsonFileSession {
    fn load(&self) -> Result<Session, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let session: Session =
                    serde_json::from_str(&content).map_err(|e| SessionError::ParseFailed {
                        path: self.path.clone(),
                        source: e,
                    })?;

                if session.version > CURRENT_VERSION {
                    return Err(SessionError::FutureVersion(session.version));
                }

                Ok(Session {
                    version: CURRENT_VERSION,
                    ..session
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No session at {:?}, starting fresh", &self.path);
                Ok(Session::default())
            }
            Err(e) => Err(SessionError::LoadFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        self.ensure_parent_dir()?;

        let json =
            to_string_pretty(session).map_err(|e| SessionError::SerializeFailed { source: e })?;

        let unique_temp = format!("{}.tmp.{}", self.path.display(), Uuid::new_v4());
        let temp_path = PathBuf::from(&unique_temp);
        write(&temp_path, json).map_err(|e| SessionError::SaveFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        let lock_file_path = self.path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file_path)
            .map_err(|e| SessionError::SaveFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| SessionError::SaveFailed {
                path: lock_file_path,
                source: e,
            })?;

        rename(&temp_path, &self.path).map_err(|e| SessionError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        lock_file.unlock().map_err(|e| SessionError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        log::trace!("Session saved to {:?}", &self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::models::store::TrayMenuCollapsed;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("focused-todo-{}", Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_save_and_load() {
        let session = Session {
            active_project_id: Some(3),
            selected_task_id: Some(12),
            tray_menu_collapsed: TrayMenuCollapsed {
                time_tracking: true,
                ..TrayMenuCollapsed::default()
            },
            week_start: Some("2024-03-03".parse().unwrap()),
            ..Session::default()
        };
        let path = temp_path("session.json");
        let storage = JsonFileSession::new(path.clone());

        if storage.save(&session).is_err() {
            panic!("Should correctly save the session");
        }
        match storage.load() {
            Ok(loaded) => assert_eq!(loaded, session),
            Err(e) => panic!("Should correctly load the saved session: {e}"),
        }

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_missing_file_is_a_fresh_session() {
        let storage = JsonFileSession::new(temp_path("absent.json"));

        assert_eq!(storage.load().unwrap(), Session::default());
    }

    #[test]
    fn test_load_invalid_json() {
        let path = std::env::temp_dir().join(format!("focused-todo-invalid-{}.json", Uuid::new_v4()));
        fs::write(&path, "{ this is not valid json }").unwrap();

        let result = JsonFileSession::new(path.clone()).load();

        match result {
            Err(SessionError::ParseFailed { .. }) => {}
            _ => panic!("Expected ParseFailed error, got something else"),
        }
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_load_without_version_field() {
        let path = std::env::temp_dir().join(format!("focused-todo-v1-{}.json", Uuid::new_v4()));
        fs::write(&path, r#"{ "selected_task_id": 4 }"#).unwrap();

        let session = JsonFileSession::new(path.clone()).load().unwrap();

        assert_eq!(session.version, CURRENT_VERSION);
        assert_eq!(session.selected_task_id, Some(4));
        assert_eq!(session.tray_menu_collapsed, TrayMenuCollapsed::default());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_load_future_version() {
        let path = std::env::temp_dir().join(format!("focused-todo-future-{}.json", Uuid::new_v4()));
        fs::write(&path, r#"{ "version": 999 }"#).unwrap();

        let result = JsonFileSession::new(path.clone()).load();

        assert!(matches!(result, Err(SessionError::FutureVersion(999))));
        let _ = fs::remove_file(path);
    }
}
