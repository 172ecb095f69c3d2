use crate::config::AppConfig;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use std::{
    future::{ready, Future, Ready},
    pin::Pin,
    rc::Rc,
};
use tracing::warn;

/// Fingerprint of the accepted bearer key, stored in request extensions so
/// handlers can log the caller without seeing the full credential.
#[derive(Debug, Clone)]
pub struct AuthedKey(pub String);

fn fingerprint(token: &str) -> String {
    token.chars().take(8).collect()
}

pub struct ApiKeyAuth;

impl<S, B> Transform<S, ServiceRequest> for ApiKeyAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiKeyAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct ApiKeyAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        // Skip auth for /health, OPTIONS preflights, and the deletion
        // confirmation endpoint (the emailed token is its credential).
        if req.method() == actix_web::http::Method::OPTIONS
            || req.path() == "/health"
            || req.path() == "/account/confirm-deletion"
        {
            return Box::pin(async move {
                srv.call(req).await.map(|res| res.map_into_left_body())
            });
        }

        let config = match req.app_data::<actix_web::web::Data<AppConfig>>() {
            Some(c) => c,
            None => {
                warn!("AppConfig missing in app_data");
                let response = HttpResponse::InternalServerError()
                    .json(serde_json::json!({ "error": "Configuration error" }));
                let (request, _payload) = req.into_parts();
                let res = ServiceResponse::new(request, response).map_into_right_body();
                return Box::pin(async move { Ok(res) });
            }
        };

        let accepted = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|auth_str| auth_str.strip_prefix("Bearer "))
            .filter(|token| config.auth.api_keys.iter().any(|key| key == token))
            .map(fingerprint);

        match accepted {
            Some(key) => {
                req.extensions_mut().insert(AuthedKey(key));
                Box::pin(async move {
                    srv.call(req).await.map(|res| res.map_into_left_body())
                })
            }
            None => {
                warn!("rejected request to {} with missing or invalid API key", req.path());
                let response = HttpResponse::Unauthorized()
                    .json(serde_json::json!({ "error": "Invalid or missing API key" }));
                let (request, _payload) = req.into_parts();
                let res = ServiceResponse::new(request, response).map_into_right_body();
                Box::pin(async move { Ok(res) })
            }
        }
    }
}
