use thiserror::Error;

use crate::{
    api::{ApiError, Backend},
    models::{
        ValidationError,
        project::{NewProject, Project, ProjectUpdate, ProjectWithCount},
        store::{Action, Store},
    },
    services::{fuzzy_find, report},
};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Failed to load projects: {0}")]
    Load(#[source] ApiError),

    #[error("Failed to create project: {0}")]
    Create(#[source] ApiError),

    #[error("Failed to update project: {0}")]
    Update(#[source] ApiError),

    #[error("Failed to delete project: {0}")]
    Delete(#[source] ApiError),

    #[error("Project '{0}' not found")]
    NotFound(String),

    #[error("Project name is ambiguous. Multiple projects found: {}", .0.join(", "))]
    Ambiguous(Vec<String>),

    #[error("Deletion of project '{0}' was not confirmed")]
    NotConfirmed(String),

    #[error("Nothing to update")]
    EmptyUpdate,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

pub fn load_projects(store: &mut Store, backend: &impl Backend) -> Result<(), ProjectError> {
    store.dispatch(Action::SetLoading(true));
    match backend.list_projects() {
        Ok(projects) => {
            store.dispatch(Action::SetProjects(projects));
            store.dispatch(Action::SetLoading(false));
            Ok(())
        }
        Err(e) => {
            let error = ProjectError::Load(e);
            report(store, &error);
            Err(error)
        }
    }
}

/// Projects with their task counts. Falls back to the plain listing, counted as zero.
pub fn load_projects_with_counts(
    store: &mut Store,
    backend: &impl Backend,
) -> Result<Vec<ProjectWithCount>, ProjectError> {
    let projects = match backend.list_projects_with_counts() {
        Ok(projects) => projects,
        Err(e) => {
            log::warn!("Task counts unavailable, listing projects without them: {e}");
            load_projects(store, backend)?;
            return Ok(store
                .projects
                .iter()
                .map(|project| ProjectWithCount {
                    project: project.clone(),
                    task_count: 0,
                })
                .collect());
        }
    };

    store.dispatch(Action::SetProjects(
        projects.iter().map(|p| p.project.clone()).collect(),
    ));
    Ok(projects)
}

/// Resolves a project by id or by (partial) name among the loaded projects.
pub fn resolve_project<'a>(store: &'a Store, project: &str) -> Result<&'a Project, ProjectError> {
    if let Ok(id) = project.trim().parse() {
        return store
            .get_project(id)
            .ok_or_else(|| ProjectError::NotFound(project.to_string()));
    }

    fuzzy_find(store.projects.iter(), project, |p| p.name.as_str()).map_err(|names| {
        if names.is_empty() {
            ProjectError::NotFound(project.to_string())
        } else {
            ProjectError::Ambiguous(names)
        }
    })
}

pub fn create_project(
    store: &mut Store,
    backend: &impl Backend,
    parameters: NewProject,
) -> Result<Project, ProjectError> {
    let parameters = parameters.validated()?;

    match backend.create_project(&parameters) {
        Ok(project) => {
            log::info!("Created project {} ({})", project.name, project.id);
            store.dispatch(Action::AddProject(project.clone()));
            Ok(project)
        }
        Err(e) => {
            let error = ProjectError::Create(e);
            report(store, &error);
            Err(error)
        }
    }
}

pub struct UpdateProjectParameters {
    pub project: String,
    pub update: ProjectUpdate,
}

pub fn update_project(
    store: &mut Store,
    backend: &impl Backend,
    parameters: UpdateProjectParameters,
) -> Result<Project, ProjectError> {
    if parameters.update.is_empty() {
        return Err(ProjectError::EmptyUpdate);
    }
    let update = parameters.update.validated()?;
    let project_id = resolve_project(store, &parameters.project)?.id;

    match backend.update_project(project_id, &update) {
        Ok(project) => {
            store.dispatch(Action::UpdateProject(project.clone()));
            Ok(project)
        }
        Err(e) => {
            let error = ProjectError::Update(e);
            report(store, &error);
            Err(error)
        }
    }
}

pub struct DeleteProjectParameters {
    pub project: String,
}

#[derive(Debug)]
pub struct DeleteProjectResult {
    pub project: Project,
    pub cascaded_tasks_count: usize,
}

/// Deletes a project and, on the backend and locally, all of its tasks.
/// `confirm` sees the project and the number of tasks going with it; the
/// backend is only called when it answers yes.
pub fn delete_project(
    store: &mut Store,
    backend: &impl Backend,
    parameters: DeleteProjectParameters,
    confirm: impl FnOnce(&Project, usize) -> bool,
) -> Result<DeleteProjectResult, ProjectError> {
    let project = resolve_project(store, &parameters.project)?.clone();
    let cascaded_tasks_count = store.get_tasks_for_project(project.id).count();

    if !confirm(&project, cascaded_tasks_count) {
        return Err(ProjectError::NotConfirmed(project.name));
    }

    if let Err(e) = backend.delete_project(project.id) {
        let error = ProjectError::Delete(e);
        report(store, &error);
        return Err(error);
    }

    store.dispatch(Action::DeleteProject(project.id));
    Ok(DeleteProjectResult {
        project,
        cascaded_tasks_count,
    })
}

pub fn open_project(store: &mut Store, project: &str) -> Result<Project, ProjectError> {
    let project = resolve_project(store, project)?.clone();
    store.dispatch(Action::SetActiveProject(Some(project.clone())));
    Ok(project)
}
