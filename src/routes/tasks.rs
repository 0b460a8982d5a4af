use crate::{
    auth::AuthenticatedUserId,
    db::Store,
    error::AppError,
    models::{List, Task, TaskInput, TaskPatch},
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

/// Outcome of checking that a list belongs to the caller.
#[derive(Debug)]
pub enum ListAccess {
    Owned(List),
    NotOwned,
}

impl ListAccess {
    /// Looks up `list_id` among the lists of `user_id`.
    pub async fn check(
        store: &dyn Store,
        list_id: Uuid,
        user_id: Uuid,
    ) -> Result<ListAccess, AppError> {
        Ok(match store.find_list(list_id, user_id).await? {
            Some(list) => ListAccess::Owned(list),
            None => ListAccess::NotOwned,
        })
    }

    /// A list that does not exist and one owned by somebody else look the same: 404.
    pub fn into_owned(self) -> Result<List, AppError> {
        match self {
            ListAccess::Owned(list) => Ok(list),
            ListAccess::NotOwned => Err(AppError::NotFound("List not found".into())),
        }
    }
}

/// Retrieves every task in a list.
///
/// Registered without the access-token requirement unless `PROTECT_TASK_LISTING` is set,
/// and does not check list ownership.
#[get("/{list_id}/tasks")]
pub async fn get_tasks(
    store: web::Data<dyn Store>,
    list_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let tasks = store.tasks_for_list(list_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a task in one of the caller's lists.
///
/// ## Responses:
/// - `200 OK`: the created task.
/// - `400 Bad Request`: invalid title.
/// - `404 Not Found`: the list is not the caller's.
#[post("/{list_id}/tasks")]
pub async fn create_task(
    store: web::Data<dyn Store>,
    user_id: AuthenticatedUserId,
    list_id: web::Path<Uuid>,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let list = ListAccess::check(store.get_ref(), list_id.into_inner(), user_id.0)
        .await?
        .into_owned()?;
    task_data.validate()?;

    let task = Task::new(task_data.into_inner(), list.id);
    store.insert_task(&task).await?;

    Ok(HttpResponse::Ok().json(task))
}

/// Applies a partial update (`title`, `completed`) to a task in one of the caller's lists.
#[patch("/{list_id}/tasks/{task_id}")]
pub async fn update_task(
    store: web::Data<dyn Store>,
    user_id: AuthenticatedUserId,
    path: web::Path<(Uuid, Uuid)>,
    task_data: web::Json<TaskPatch>,
) -> Result<impl Responder, AppError> {
    let (list_id, task_id) = path.into_inner();
    let list = ListAccess::check(store.get_ref(), list_id, user_id.0)
        .await?
        .into_owned()?;
    task_data.validate()?;

    store
        .update_task(task_id, list.id, &task_data)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Updated successfully." })))
}

/// Deletes a task from one of the caller's lists and returns it.
#[delete("/{list_id}/tasks/{task_id}")]
pub async fn delete_task(
    store: web::Data<dyn Store>,
    user_id: AuthenticatedUserId,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<impl Responder, AppError> {
    let (list_id, task_id) = path.into_inner();
    let list = ListAccess::check(store.get_ref(), list_id, user_id.0)
        .await?
        .into_owned()?;

    let removed = store
        .delete_task(task_id, list.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    Ok(HttpResponse::Ok().json(removed))
}
