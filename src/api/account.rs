use actix_web::{get, post, web, HttpResponse, Result as WebResult};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::api::models::{ConfirmDeletionBody, ConfirmDeletionQuery, DeletionRequestBody};
use crate::config::AppConfig;
use crate::db::{service::DbService, DbPool};
use crate::email::Mailer;

/// Starts the account-deletion flow: persist a token with a short expiry and
/// email a confirmation link. Deletion itself only happens on confirmation.
#[post("/deletion-request")]
pub async fn request_deletion(
    config: web::Data<AppConfig>,
    pool: web::Data<DbPool>,
    mailer: web::Data<Arc<dyn Mailer>>,
    body: web::Json<DeletionRequestBody>,
) -> WebResult<HttpResponse> {
    let email = body.into_inner().email;
    if email.trim().is_empty() || !email.contains('@') {
        return Ok(HttpResponse::BadRequest().json(json!({ "error": "A valid email is required" })));
    }

    let request = {
        let conn = pool.lock().unwrap();
        match DbService::insert_deletion_request(&conn, &email, config.auth.token_expiry_hours) {
            Ok(request) => request,
            Err(e) => {
                error!("Error creating deletion request: {}", e);
                return Ok(HttpResponse::InternalServerError()
                    .json(json!({ "error": "Failed to create deletion request" })));
            }
        }
        // Lock dropped here; mail delivery is a network boundary.
    };

    info!("Created deletion request {} for {}", request.token, email);

    let confirm_url = format!(
        "{}/account/confirm-deletion?token={}",
        config.server.base_url(),
        request.token
    );

    if let Err(e) = mailer
        .send_deletion_confirmation(&email, &confirm_url, config.auth.token_expiry_hours)
        .await
    {
        error!("Failed to send deletion confirmation: {}", e);
        return Ok(HttpResponse::InternalServerError()
            .json(json!({ "error": "Failed to send confirmation email" })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Confirmation email sent. Please check your inbox."
    })))
}

/// Completes the flow. The emailed token is the credential; unknown, expired
/// or already-confirmed tokens all get the same answer.
#[post("/confirm-deletion")]
pub async fn confirm_deletion(
    pool: web::Data<DbPool>,
    body: web::Json<ConfirmDeletionBody>,
) -> WebResult<HttpResponse> {
    let token = body.into_inner().token;
    let conn = pool.lock().unwrap();

    match DbService::confirm_deletion(&conn, token) {
        Ok(true) => {
            info!("Confirmed account deletion for token {}", token);
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "message": "Your account data has been permanently deleted."
            })))
        }
        Ok(false) => Ok(HttpResponse::NotFound()
            .json(json!({ "error": "Invalid or expired confirmation link" }))),
        Err(e) => {
            error!("Error confirming deletion: {}", e);
            Ok(HttpResponse::InternalServerError()
                .json(json!({ "error": "Failed to delete account data" })))
        }
    }
}

/// Serves the emailed link directly. Mail clients open it with a plain GET,
/// so the confirmation runs here and the outcome is rendered as HTML.
#[get("/confirm-deletion")]
pub async fn confirm_deletion_link(
    pool: web::Data<DbPool>,
    query: web::Query<ConfirmDeletionQuery>,
) -> WebResult<HttpResponse> {
    let token = query.into_inner().token;
    let conn = pool.lock().unwrap();

    match DbService::confirm_deletion(&conn, token) {
        Ok(true) => {
            info!("Confirmed account deletion for token {}", token);
            Ok(HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(
                    "<h1>Account deleted</h1>\
                     <p>Your account data has been permanently deleted.</p>",
                ))
        }
        Ok(false) => Ok(HttpResponse::NotFound()
            .content_type("text/html; charset=utf-8")
            .body(
                "<h1>Link invalid</h1>\
                 <p>This confirmation link is invalid or has expired.</p>",
            )),
        Err(e) => {
            error!("Error confirming deletion: {}", e);
            Ok(HttpResponse::InternalServerError()
                .content_type("text/html; charset=utf-8")
                .body("<h1>Something went wrong</h1><p>Please try again later.</p>"))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/account")
            .service(request_deletion)
            .service(confirm_deletion)
            .service(confirm_deletion_link),
    );
}
