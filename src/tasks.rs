// src/tasks.rs

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use log::error;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::TaskError;
use crate::task::{Task, TaskDraft};

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    pub completed: bool,
}

fn current_user(req: &HttpRequest) -> Option<String> {
    req.extensions().get::<String>().cloned()
}

fn task_error_response(e: &TaskError) -> HttpResponse {
    match e {
        TaskError::Validation(_) => HttpResponse::BadRequest().body(e.to_string()),
        TaskError::Backend(err) => {
            error!("Task backend failure: {}", err);
            HttpResponse::InternalServerError().body("Task operation failed")
        }
    }
}

/// GET /tasks?search=…
/// Refreshes the list from the backend, then applies the client-side title
/// filter. With no query the full list is returned in `dueDate` order.
pub async fn list_tasks(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<TaskQuery>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }

    let mut controller = data.controller.lock().await;
    if let Err(e) = controller.refresh().await {
        return task_error_response(&e);
    }
    let search = query.search.as_deref().unwrap_or("");
    let tasks: Vec<Task> = controller.filter(search).cloned().collect();
    HttpResponse::Ok().json(tasks)
}

/// POST /tasks
pub async fn create_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<TaskDraft>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }

    let mut controller = data.controller.lock().await;
    match controller.create(&payload).await {
        Ok(()) => HttpResponse::Ok().json(controller.tasks()),
        Err(e) => task_error_response(&e),
    }
}

/// PUT /tasks/{task_id}
pub async fn update_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<TaskDraft>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }

    let task_id = path.into_inner();
    let mut controller = data.controller.lock().await;
    match controller.update(&task_id, &payload).await {
        Ok(()) => HttpResponse::Ok().json(controller.tasks()),
        Err(e) => task_error_response(&e),
    }
}

/// PUT /tasks/{task_id}/complete
pub async fn complete_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<CompletionRequest>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }

    let task_id = path.into_inner();
    let mut controller = data.controller.lock().await;
    match controller.toggle_completion(&task_id, payload.completed).await {
        Ok(()) => HttpResponse::Ok().json(controller.tasks()),
        Err(e) => task_error_response(&e),
    }
}

/// DELETE /tasks/{task_id}
pub async fn delete_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }

    let task_id = path.into_inner();
    let mut controller = data.controller.lock().await;
    match controller.delete(&task_id).await {
        Ok(()) => HttpResponse::Ok().json(controller.tasks()),
        Err(e) => task_error_response(&e),
    }
}
