use crate::entities::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use uuid::Uuid;

pub mod web;

pub use web::{TodoState, create_todo_router};

#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct Todo {
    id: Uuid,
    title: String,
    description: String,
    done: bool,
    created_at: DateTime<Utc>,
}

impl Todo {
    pub fn new(
        id: Uuid,
        title: String,
        description: String,
        done: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            done,
            created_at,
        }
    }

    /// Returns the ID of the todo.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns whether the todo has been marked as done.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Creation time as shown on the list pages.
    pub fn created_at_display(&self) -> String {
        self.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }
}

impl From<todo::Model> for Todo {
    fn from(model: todo::Model) -> Self {
        Todo::new(
            model.id,
            model.title,
            model.description,
            model.done,
            model.created_at,
        )
    }
}

/// Error type for todo store operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoServiceError {
    /// A title or description was missing or empty.
    #[error("Title and description are required")]
    Validation,
    /// No todo exists with the given ID.
    #[error("Todo with ID {0} not found")]
    NotFound(Uuid),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Checks that both user-editable fields are non-empty.
pub fn validate_fields(title: &str, description: &str) -> Result<(), TodoServiceError> {
    if title.is_empty() || description.is_empty() {
        return Err(TodoServiceError::Validation);
    }
    Ok(())
}

/// Persistence operations behind the todo pages.
///
/// Every operation maps to a single statement against the underlying store.
/// Handlers only ever see this trait, so the store can be swapped out in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Inserts a new, not yet done todo.
    ///
    /// # Errors
    ///
    /// Returns [`TodoServiceError::Validation`] if either field is empty.
    async fn create(&self, title: String, description: String) -> Result<Todo, TodoServiceError>;

    /// Lists todos that are not done, newest first.
    async fn list_active(&self) -> Result<Vec<Todo>, TodoServiceError>;

    /// Lists todos that are done, newest first.
    async fn list_done(&self) -> Result<Vec<Todo>, TodoServiceError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Todo, TodoServiceError>;

    /// Overwrites the title and description of an existing todo.
    ///
    /// The done flag and creation time are left untouched.
    async fn update(
        &self,
        id: Uuid,
        title: String,
        description: String,
    ) -> Result<(), TodoServiceError>;

    async fn mark_done(&self, id: Uuid) -> Result<(), TodoServiceError>;

    /// Removes a todo. Deleting an ID that does not exist is reported as
    /// [`TodoServiceError::NotFound`].
    async fn delete(&self, id: Uuid) -> Result<(), TodoServiceError>;
}

/// [`TodoStore`] backed by a sea-orm connection.
pub struct TodoService {
    db: DatabaseConnection,
}

impl TodoService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[tracing::instrument(skip(self))]
    async fn list_by_status(&self, done: bool) -> Result<Vec<Todo>, TodoServiceError> {
        let todos = todo::Entity::find()
            .filter(todo::Column::Done.eq(done))
            .order_by_desc(todo::Column::CreatedAt)
            .order_by_desc(todo::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Todo::from)
            .collect();
        Ok(todos)
    }

    // SQLite and PostgreSQL count matched rows, so re-marking a done todo still counts as one.
    fn ensure_affected(id: Uuid, rows_affected: u64) -> Result<(), TodoServiceError> {
        if rows_affected == 0 {
            return Err(TodoServiceError::NotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl TodoStore for TodoService {
    #[tracing::instrument(skip(self))]
    async fn create(&self, title: String, description: String) -> Result<Todo, TodoServiceError> {
        validate_fields(&title, &description)?;

        let active_model = todo::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            title: ActiveValue::Set(title),
            description: ActiveValue::Set(description),
            done: ActiveValue::Set(false),
            created_at: ActiveValue::Set(Utc::now()),
        };
        let created_model = active_model.insert(&self.db).await?;
        Ok(Todo::from(created_model))
    }

    #[tracing::instrument(skip(self))]
    async fn list_active(&self) -> Result<Vec<Todo>, TodoServiceError> {
        self.list_by_status(false).await
    }

    #[tracing::instrument(skip(self))]
    async fn list_done(&self) -> Result<Vec<Todo>, TodoServiceError> {
        self.list_by_status(true).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> Result<Todo, TodoServiceError> {
        let todo_model = todo::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(TodoServiceError::NotFound(id))?;
        Ok(Todo::from(todo_model))
    }

    #[tracing::instrument(skip(self))]
    async fn update(
        &self,
        id: Uuid,
        title: String,
        description: String,
    ) -> Result<(), TodoServiceError> {
        validate_fields(&title, &description)?;

        let result = todo::Entity::update_many()
            .col_expr(todo::Column::Title, Expr::value(title))
            .col_expr(todo::Column::Description, Expr::value(description))
            .filter(todo::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Self::ensure_affected(id, result.rows_affected)
    }

    #[tracing::instrument(skip(self))]
    async fn mark_done(&self, id: Uuid) -> Result<(), TodoServiceError> {
        let result = todo::Entity::update_many()
            .col_expr(todo::Column::Done, Expr::value(true))
            .filter(todo::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Self::ensure_affected(id, result.rows_affected)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<(), TodoServiceError> {
        let result = todo::Entity::delete_by_id(id).exec(&self.db).await?;
        Self::ensure_affected(id, result.rows_affected)
    }
}
