use actix_web::{delete, get, post, web, HttpResponse, Result as WebResult};
use uuid::Uuid;

use crate::api::models::{CreateMessageRequest, CreateSessionRequest, PaginationQuery};
use crate::chat::validate_messages;
use crate::db::service::{DbService, DEFAULT_SESSION_TITLE};
use crate::db::DbPool;

// --- Sessions ---

#[post("")]
pub async fn create_session(
    pool: web::Data<DbPool>,
    req: web::Json<CreateSessionRequest>,
) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();
    let title = req.into_inner().title;
    let title = title.as_deref().unwrap_or(DEFAULT_SESSION_TITLE);

    match DbService::insert_session(&conn, title) {
        Ok(session) => Ok(HttpResponse::Created().json(session)),
        Err(e) => Ok(HttpResponse::InternalServerError().body(e.to_string())),
    }
}

#[get("")]
pub async fn list_sessions(
    pool: web::Data<DbPool>,
    query: web::Query<PaginationQuery>,
) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::list_sessions(&conn, query.limit, query.offset) {
        Ok(sessions) => Ok(HttpResponse::Ok().json(sessions)),
        Err(e) => Ok(HttpResponse::InternalServerError().body(e.to_string())),
    }
}

#[get("/{id}")]
pub async fn get_session(pool: web::Data<DbPool>, id: web::Path<Uuid>) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::get_session(&conn, id.into_inner()) {
        Ok(Some(session)) => Ok(HttpResponse::Ok().json(session)),
        Ok(None) => Ok(HttpResponse::NotFound().finish()),
        Err(e) => Ok(HttpResponse::InternalServerError().body(e.to_string())),
    }
}

#[delete("/{id}")]
pub async fn delete_session(
    pool: web::Data<DbPool>,
    id: web::Path<Uuid>,
) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();
    let id = id.into_inner();

    // Check if exists first for better 404 handling
    match DbService::get_session(&conn, id) {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(HttpResponse::NotFound().finish()),
        Err(e) => return Ok(HttpResponse::InternalServerError().body(e.to_string())),
    }

    match DbService::delete_session(&conn, id) {
        Ok(_) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(HttpResponse::InternalServerError().body(e.to_string())),
    }
}

// --- Messages ---

/// Persists a single message. Runs the same validator as the relay so both
/// surfaces reject with identical reasons; no completion is triggered here,
/// streaming goes through /v1/study-chat.
#[post("/{id}/messages")]
pub async fn add_message(
    pool: web::Data<DbPool>,
    id: web::Path<Uuid>,
    req: web::Json<CreateMessageRequest>,
) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();
    let id = id.into_inner();
    let req = req.into_inner();

    let value = serde_json::json!([{ "role": req.role, "content": req.content }]);
    let message = match validate_messages(&value) {
        Ok(mut validated) => validated.remove(0),
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "error": e.to_string() })))
        }
    };

    match DbService::get_session(&conn, id) {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(HttpResponse::NotFound().body("Session not found")),
        Err(e) => return Ok(HttpResponse::InternalServerError().body(e.to_string())),
    }

    match DbService::insert_message(&conn, id, message.role.as_str(), &message.content) {
        Ok(saved) => Ok(HttpResponse::Created().json(saved)),
        Err(e) => Ok(HttpResponse::InternalServerError().body(e.to_string())),
    }
}

#[get("/{id}/messages")]
pub async fn get_messages(
    pool: web::Data<DbPool>,
    id: web::Path<Uuid>,
    query: web::Query<PaginationQuery>,
) -> WebResult<HttpResponse> {
    let conn = pool.lock().unwrap();

    match DbService::get_messages(&conn, id.into_inner(), query.limit, query.offset) {
        Ok(messages) => Ok(HttpResponse::Ok().json(messages)),
        Err(e) => Ok(HttpResponse::InternalServerError().body(e.to_string())),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/sessions")
            .service(create_session)
            .service(list_sessions)
            .service(get_session)
            .service(delete_session)
            .service(add_message)
            .service(get_messages),
    );
}
