use actix_web::{HttpResponse, web};
use serde_json::json;
use tracing::info;

use crate::api::person::kind_from_path;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::model::{DateKey, DayBook, DayNote};
use crate::store::{DocumentStore, FieldUpdate};

fn book_from_path(book: &str) -> Result<DayBook, ApiError> {
    book.parse::<DayBook>()
        .map_err(|_| ApiError::NotFound(format!("Unknown day book `{book}`")))
}

/// Record an absence or leave day
///
/// Writing the same day again replaces its notes.
#[utoipa::path(
    put,
    path = "/api/{kind}/{id}/{book}/{date}",
    params(
        ("kind" = String, Path, description = "`teachers` or `employees`"),
        ("id" = String, Path, description = "Record id"),
        ("book" = String, Path, description = "`absences` or `leaves`"),
        ("date" = String, Path, description = "Day as `YYYY-MM-DD` or `YYYY_MM_DD`")
    ),
    request_body = DayNote,
    responses(
        (status = 200, description = "Day recorded", body = Object, example = json!({
            "message": "Day recorded",
            "date": "2025_01_12"
        })),
        (status = 400, description = "Invalid date"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Absences"
)]
pub async fn put_day(
    _auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<(String, String, String, String)>,
    body: web::Json<DayNote>,
) -> Result<HttpResponse, ApiError> {
    let (collection, id, book, date) = path.into_inner();
    let kind = kind_from_path(&collection)?;
    let book = book_from_path(&book)?;
    let day: DateKey = date.parse()?;

    let note = json!({ "notes": body.notes });
    store
        .update_fields(kind.collection(), &id, vec![FieldUpdate::new(book.entry_path(day), note)])
        .await?;

    info!(kind = %kind, id = %id, book = %book, day = %day, "Day recorded");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Day recorded",
        "date": day.to_string()
    })))
}

/// Remove an absence or leave day
#[utoipa::path(
    delete,
    path = "/api/{kind}/{id}/{book}/{date}",
    params(
        ("kind" = String, Path, description = "`teachers` or `employees`"),
        ("id" = String, Path, description = "Record id"),
        ("book" = String, Path, description = "`absences` or `leaves`"),
        ("date" = String, Path, description = "Day as `YYYY-MM-DD` or `YYYY_MM_DD`")
    ),
    responses(
        (status = 200, description = "Day removed (or was never recorded)", body = Object, example = json!({
            "message": "Day removed",
            "date": "2025_01_12"
        })),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Absences"
)]
pub async fn delete_day(
    _auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<(String, String, String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (collection, id, book, date) = path.into_inner();
    let kind = kind_from_path(&collection)?;
    let book = book_from_path(&book)?;
    let day: DateKey = date.parse()?;

    store
        .delete_field(kind.collection(), &id, book.entry_path(day))
        .await?;

    info!(kind = %kind, id = %id, book = %book, day = %day, "Day removed");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Day removed",
        "date": day.to_string()
    })))
}
