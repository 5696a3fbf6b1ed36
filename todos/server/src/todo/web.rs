use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::todo::{Todo, TodoServiceError, TodoStore};

const FIELDS_REQUIRED: &str = "Title and description are required";
const ID_REQUIRED: &str = "Id is required";
const TODO_NOT_FOUND: &str = "Todo not found";
const GENERIC_FAILURE: &str = "An error occurred";
const DELETE_FAILURE: &str = "An error occurred while deleting the todo";
const UPDATE_FAILURE: &str = "An error occurred while updating the todo";

const TODO_CREATED: &str = "Todo created successfully";
const TODO_DELETED: &str = "Todo deleted successfully";
const TODO_MARKED_DONE: &str = "Todo marked as done successfully";

#[derive(Clone)]
pub struct TodoState {
    pub store: Arc<dyn TodoStore>,
}

impl TodoState {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }
}

/// Tag carried in the `_action` field of the active list form.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ActionTag {
    Create,
    Delete,
    MarkDone,
}

#[derive(Debug, Deserialize)]
pub struct ActiveListForm {
    #[serde(rename = "_action")]
    action: ActionTag,
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DoneListForm {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditTodoForm {
    title: Option<String>,
    description: Option<String>,
}

/// Writes accepted by the active list page.
#[derive(Debug, PartialEq, Eq)]
pub enum ActiveListIntent {
    Create { title: String, description: String },
    Delete(Uuid),
    MarkDone(Uuid),
}

/// Writes accepted by the done list page.
#[derive(Debug, PartialEq, Eq)]
pub enum DoneListIntent {
    Delete(Uuid),
}

impl TryFrom<ActiveListForm> for ActiveListIntent {
    type Error = TodoError;

    fn try_from(form: ActiveListForm) -> Result<Self, Self::Error> {
        match form.action {
            ActionTag::Create => {
                let (title, description) = required_fields(form.title, form.description)?;
                Ok(ActiveListIntent::Create { title, description })
            }
            ActionTag::Delete => active_list_id(form.id).map(ActiveListIntent::Delete),
            ActionTag::MarkDone => active_list_id(form.id).map(ActiveListIntent::MarkDone),
        }
    }
}

impl TryFrom<DoneListForm> for DoneListIntent {
    type Error = TodoError;

    fn try_from(form: DoneListForm) -> Result<Self, Self::Error> {
        let id = present(form.id).ok_or(TodoError::Validation(ID_REQUIRED))?;
        parse_id(&id, DELETE_FAILURE).map(DoneListIntent::Delete)
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn required_fields(
    title: Option<String>,
    description: Option<String>,
) -> Result<(String, String), TodoError> {
    match (present(title), present(description)) {
        (Some(title), Some(description)) => Ok((title, description)),
        _ => Err(TodoError::Validation(FIELDS_REQUIRED)),
    }
}

/// Parses a submitted todo ID. An ID that is not a UUID can never match a
/// row, so it fails the same way a missing row would.
fn parse_id(id: &str, failure_message: &'static str) -> Result<Uuid, TodoError> {
    Uuid::parse_str(id).map_err(|err| TodoError::Operation {
        message: failure_message,
        source: err.into(),
    })
}

/// The active list has no dedicated message for a missing ID; it fails like
/// any other write against a row that is not there.
fn active_list_id(id: Option<String>) -> Result<Uuid, TodoError> {
    let id = present(id).ok_or_else(|| TodoError::Operation {
        message: GENERIC_FAILURE,
        source: anyhow::anyhow!("No todo ID submitted"),
    })?;
    parse_id(&id, GENERIC_FAILURE)
}

/// Custom error type for todo handler operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    /// Represents an error during template rendering.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
    /// A required form field was missing or empty.
    #[error("{0}")]
    Validation(&'static str),
    /// The requested todo does not exist.
    #[error("Todo not found")]
    NotFound,
    /// The store failed; only `message` is shown to the user.
    #[error("{message}")]
    Operation {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl TodoError {
    /// Maps a store failure onto what the caller gets to see.
    fn from_service(err: TodoServiceError, failure_message: &'static str) -> Self {
        match err {
            TodoServiceError::Validation => TodoError::Validation(FIELDS_REQUIRED),
            err => TodoError::Operation {
                message: failure_message,
                source: err.into(),
            },
        }
    }

    /// Logs the failure and picks the status and message the user gets.
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            TodoError::Validation(message) => (StatusCode::BAD_REQUEST, *message),
            TodoError::NotFound => (StatusCode::NOT_FOUND, TODO_NOT_FOUND),
            TodoError::Operation { message, source } => {
                tracing::error!("{}: {:#}", message, source);
                (StatusCode::INTERNAL_SERVER_ERROR, *message)
            }
            TodoError::Template(err) => {
                tracing::error!("Failed to render template: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
            }
        }
    }
}

impl IntoResponse for TodoError {
    fn into_response(self) -> Response {
        let (status_code, user_facing_error_message) = self.status_and_message();

        let error_template = ErrorMessageTemplate::new(user_facing_error_message);
        let Ok(rendered) = error_template.render() else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };

        let mut response = (status_code, Html(rendered)).into_response();
        // Point htmx at the error slot instead of the list panel
        let headers = response.headers_mut();
        headers.insert(
            HeaderName::from_static("hx-retarget"),
            HeaderValue::from_static("#error-message"),
        );
        headers.insert(
            HeaderName::from_static("hx-reswap"),
            HeaderValue::from_static("innerHTML"),
        );
        response
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct ActivePageTemplate {
    todos: Vec<Todo>,
    success: Option<&'static str>,
}

impl ActivePageTemplate {
    pub fn new(todos: Vec<Todo>) -> Self {
        Self {
            todos,
            success: None,
        }
    }
}

#[derive(Template)]
#[template(path = "todos/active_panel.html")]
struct ActivePanelTemplate {
    todos: Vec<Todo>,
    success: Option<&'static str>,
}

impl ActivePanelTemplate {
    pub fn new(todos: Vec<Todo>, success: &'static str) -> Self {
        Self {
            todos,
            success: Some(success),
        }
    }
}

#[derive(Template)]
#[template(path = "done.html")]
struct DonePageTemplate {
    todos: Vec<Todo>,
    success: Option<&'static str>,
}

impl DonePageTemplate {
    pub fn new(todos: Vec<Todo>) -> Self {
        Self {
            todos,
            success: None,
        }
    }
}

#[derive(Template)]
#[template(path = "todos/done_panel.html")]
struct DonePanelTemplate {
    todos: Vec<Todo>,
    success: Option<&'static str>,
}

impl DonePanelTemplate {
    pub fn new(todos: Vec<Todo>, success: &'static str) -> Self {
        Self {
            todos,
            success: Some(success),
        }
    }
}

#[derive(Template)]
#[template(path = "edit.html")]
struct EditPageTemplate {
    id: String,
    title: String,
    description: String,
    error: Option<&'static str>,
}

impl EditPageTemplate {
    pub fn new(todo: Todo) -> Self {
        Self {
            id: todo.id().to_string(),
            title: todo.title().to_string(),
            description: todo.description().to_string(),
            error: None,
        }
    }

    /// Re-renders a rejected edit with what the user submitted.
    pub fn rejected(id: String, title: String, description: String, error: &'static str) -> Self {
        Self {
            id,
            title,
            description,
            error: Some(error),
        }
    }
}

#[derive(Template)]
#[template(path = "todos/error_message.html")]
struct ErrorMessageTemplate {
    message: &'static str,
}

impl ErrorMessageTemplate {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// Handler for GET / that renders the page of todos not done yet.
#[tracing::instrument(skip(state))]
async fn active_page_handler(
    State(state): State<Arc<TodoState>>,
) -> Result<Html<String>, TodoError> {
    let todos = state
        .store
        .list_active()
        .await
        .map_err(|err| TodoError::from_service(err, GENERIC_FAILURE))?;
    let template = ActivePageTemplate::new(todos);
    template.render().map(Html).map_err(TodoError::from)
}

/// Handler for POST / that applies one intent and returns the refreshed panel.
#[tracing::instrument(skip(state))]
async fn active_action_handler(
    State(state): State<Arc<TodoState>>,
    Form(form): Form<ActiveListForm>,
) -> Result<Html<String>, TodoError> {
    let success = match ActiveListIntent::try_from(form)? {
        ActiveListIntent::Create { title, description } => {
            state.store.create(title, description).await.map(|_| TODO_CREATED)
        }
        ActiveListIntent::Delete(id) => state.store.delete(id).await.map(|_| TODO_DELETED),
        ActiveListIntent::MarkDone(id) => {
            state.store.mark_done(id).await.map(|_| TODO_MARKED_DONE)
        }
    }
    .map_err(|err| TodoError::from_service(err, GENERIC_FAILURE))?;

    let todos = state
        .store
        .list_active()
        .await
        .map_err(|err| TodoError::from_service(err, GENERIC_FAILURE))?;
    let template = ActivePanelTemplate::new(todos, success);
    template.render().map(Html).map_err(TodoError::from)
}

/// Handler for GET /done that renders the page of finished todos.
#[tracing::instrument(skip(state))]
async fn done_page_handler(State(state): State<Arc<TodoState>>) -> Result<Html<String>, TodoError> {
    let todos = state
        .store
        .list_done()
        .await
        .map_err(|err| TodoError::from_service(err, GENERIC_FAILURE))?;
    let template = DonePageTemplate::new(todos);
    template.render().map(Html).map_err(TodoError::from)
}

/// Handler for POST /done that deletes a finished todo.
#[tracing::instrument(skip(state))]
async fn done_action_handler(
    State(state): State<Arc<TodoState>>,
    Form(form): Form<DoneListForm>,
) -> Result<Html<String>, TodoError> {
    let success = match DoneListIntent::try_from(form)? {
        DoneListIntent::Delete(id) => state.store.delete(id).await.map(|_| TODO_DELETED),
    }
    .map_err(|err| TodoError::from_service(err, DELETE_FAILURE))?;

    let todos = state
        .store
        .list_done()
        .await
        .map_err(|err| TodoError::from_service(err, GENERIC_FAILURE))?;
    let template = DonePanelTemplate::new(todos, success);
    template.render().map(Html).map_err(TodoError::from)
}

/// Handler for GET /edit/{id} that serves the edit form for one todo.
#[tracing::instrument(skip(state))]
async fn edit_page_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<String>,
) -> Result<Html<String>, TodoError> {
    let id = Uuid::parse_str(&id).map_err(|_| TodoError::NotFound)?;

    match state.store.get_by_id(id).await {
        Ok(todo) => {
            let template = EditPageTemplate::new(todo);
            template.render().map(Html).map_err(TodoError::from)
        }
        Err(TodoServiceError::NotFound(_)) => Err(TodoError::NotFound),
        Err(err) => Err(TodoError::from_service(err, GENERIC_FAILURE)),
    }
}

async fn save_edit(
    store: &dyn TodoStore,
    id: &str,
    title: String,
    description: String,
) -> Result<(), TodoError> {
    let (title, description) = required_fields(Some(title), Some(description))?;
    let id = parse_id(id, UPDATE_FAILURE)?;

    store
        .update(id, title, description)
        .await
        .map_err(|err| TodoError::from_service(err, UPDATE_FAILURE))
}

/// Handler for POST /edit/{id} that saves the edit and goes back to the list.
/// A rejected edit comes back as the form again, still holding the input.
#[tracing::instrument(skip(state))]
async fn update_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<String>,
    Form(form): Form<EditTodoForm>,
) -> Result<Response, TodoError> {
    let title = form.title.unwrap_or_default();
    let description = form.description.unwrap_or_default();

    match save_edit(state.store.as_ref(), &id, title.clone(), description.clone()).await {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err(err) => {
            let (status_code, message) = err.status_and_message();
            let template = EditPageTemplate::rejected(id, title, description, message);
            let rendered = template.render()?;
            Ok((status_code, Html(rendered)).into_response())
        }
    }
}

/// Creates and returns the todo router with all page routes.
pub fn create_todo_router(state: Arc<TodoState>) -> Router {
    Router::new()
        .route("/", get(active_page_handler).post(active_action_handler))
        .route("/done", get(done_page_handler).post(done_action_handler))
        .route(
            "/edit/{id}",
            get(edit_page_handler).post(update_todo_handler),
        )
        .with_state(state)
}
