use crate::{
    auth::AuthenticatedUserId,
    db::Store,
    error::AppError,
    models::{List, ListInput, ListPatch},
};
use actix_web::{delete, get, patch, post, rt, web, HttpResponse, Responder};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Retrieves every list owned by the authenticated user.
#[get("")]
pub async fn get_lists(
    store: web::Data<dyn Store>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let lists = store.lists_for_user(user_id.0).await?;
    Ok(HttpResponse::Ok().json(lists))
}

/// Creates a list owned by the authenticated user and returns it, id included.
#[post("")]
pub async fn create_list(
    store: web::Data<dyn Store>,
    user_id: AuthenticatedUserId,
    list_data: web::Json<ListInput>,
) -> Result<impl Responder, AppError> {
    list_data.validate()?;

    let list = List::new(list_data.into_inner(), user_id.0);
    store.insert_list(&list).await?;

    Ok(HttpResponse::Ok().json(list))
}

/// Applies a partial update to one of the caller's lists.
///
/// ## Responses:
/// - `200 OK`: `{ "message": ... }`.
/// - `404 Not Found`: no such list, or it belongs to someone else.
#[patch("/{id}")]
pub async fn update_list(
    store: web::Data<dyn Store>,
    user_id: AuthenticatedUserId,
    list_id: web::Path<Uuid>,
    list_data: web::Json<ListPatch>,
) -> Result<impl Responder, AppError> {
    list_data.validate()?;

    store
        .update_list(list_id.into_inner(), user_id.0, &list_data)
        .await?
        .ok_or_else(|| AppError::NotFound("List not found".into()))?;

    Ok(HttpResponse::Ok().json(json!({ "message": "updated successfully" })))
}

/// Removes one of the caller's lists and returns it.
///
/// The list's tasks are deleted afterwards on a detached task. That step is best-effort:
/// a failure is logged and leaves orphaned tasks behind.
#[delete("/{id}")]
pub async fn delete_list(
    store: web::Data<dyn Store>,
    user_id: AuthenticatedUserId,
    list_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let removed = store
        .delete_list(list_id.into_inner(), user_id.0)
        .await?
        .ok_or_else(|| AppError::NotFound("List not found".into()))?;

    spawn_task_cascade(store.into_inner(), removed.id);

    Ok(HttpResponse::Ok().json(removed))
}

fn spawn_task_cascade(store: Arc<dyn Store>, list_id: Uuid) {
    rt::spawn(async move {
        match store.delete_tasks_in_list(list_id).await {
            Ok(count) => log::info!("Deleted {} tasks from list {}", count, list_id),
            Err(e) => log::error!("Failed to delete tasks of list {}: {}", list_id, e),
        }
    });
}
