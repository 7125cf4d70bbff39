use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::debug;

use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;

fn reject(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(json!({ "message": message }));
    req.into_response(resp.map_into_boxed_body())
}

/// Pulls the bearer token out of the `Authorization` header.
fn bearer(req: &ServiceRequest) -> Result<&str, &'static str> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header encoding")?;

    header
        .strip_prefix("Bearer ")
        .ok_or("Authorization header must start with Bearer")
}

/// Verifies the bearer token and hands the caller to handlers as [`AuthUser`].
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let claims = match bearer(&req) {
        Ok(token) => verify_token(token, &config.jwt_secret).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            "Invalid or expired token"
        }),
        Err(message) => Err(message),
    };

    match claims {
        Ok(claims) => {
            req.extensions_mut().insert(AuthUser {
                subject: claims.sub,
                role: claims.role,
            });
            next.call(req).await
        }
        Err(message) => Ok(reject(req, message)),
    }
}
