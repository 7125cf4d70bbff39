use actix_web::{HttpResponse, web};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::api::person::kind_from_path;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::ledger::{self, LedgerRollup, RosterReader, SalaryEdit};
use crate::model::{AcademicYear, MonthKey, Person, PersonKind};
use crate::store::DocumentStore;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct YearQuery {
    #[schema(example = "academic_2024-2025")]
    /// Academic year key; defaults to the current academic year
    pub year: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SalaryEntryRequest {
    #[schema(example = 250.0)]
    pub amount: f64,
    #[schema(example = "bonus")]
    #[serde(default)]
    pub notes: String,
    #[schema(example = "academic_2024-2025")]
    /// Academic year key; defaults to the current academic year
    pub year: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ResetQuery {
    #[schema(example = "academic_2024-2025")]
    /// Academic year key; defaults to the current academic year
    pub year: Option<String>,
    #[schema(example = "academic_2024-2025")]
    /// Must repeat the academic year key being reset
    pub confirm: Option<String>,
}

/// "Current" is taken from the wall clock here, never inside the ledger.
fn resolve_year(requested: Option<&str>) -> Result<AcademicYear, ApiError> {
    match requested {
        Some(key) => Ok(key.parse()?),
        None => Ok(AcademicYear::containing(Local::now().date_naive())),
    }
}

/// Salary table of one academic year
#[utoipa::path(
    get,
    path = "/api/salaries",
    params(YearQuery),
    responses(
        (status = 200, description = "Per-person, per-month and grand totals", body = LedgerRollup),
        (status = 400, description = "Invalid academic year key"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Salaries"
)]
pub async fn salary_table(
    _auth: AuthUser,
    roster: web::Data<RosterReader>,
    query: web::Query<YearQuery>,
) -> Result<HttpResponse, ApiError> {
    let year = resolve_year(query.year.as_deref())?;
    let snapshot = roster.snapshot();

    Ok(HttpResponse::Ok().json(ledger::rollup(snapshot.people(), year)))
}

/// Write one salary cell
///
/// Replaces the whole entry for (person, year, month). Other months and
/// years of the person are left untouched.
#[utoipa::path(
    put,
    path = "/api/salaries/{kind}/{id}/{month}",
    params(
        ("kind" = String, Path, description = "`teachers` or `employees`"),
        ("id" = String, Path, description = "Record id"),
        ("month" = String, Path, description = "Month key `1`..`12`")
    ),
    request_body = SalaryEntryRequest,
    responses(
        (status = 200, description = "Entry written", body = Object, example = json!({
            "message": "Salary entry saved",
            "year": "academic_2024-2025",
            "month": "11"
        })),
        (status = 400, description = "Invalid amount, month or year"),
        (status = 404, description = "Record not found"),
        (status = 503, description = "Document store unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Salaries"
)]
pub async fn put_salary_entry(
    _auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<(String, String, String)>,
    body: web::Json<SalaryEntryRequest>,
) -> Result<HttpResponse, ApiError> {
    let (collection, id, month) = path.into_inner();
    let body = body.into_inner();

    let edit = SalaryEdit {
        person_kind: kind_from_path(&collection)?,
        person_id: id,
        year: resolve_year(body.year.as_deref())?,
        month: month.parse::<MonthKey>()?,
        amount: body.amount,
        notes: body.notes,
    };

    ledger::set_salary_entry(store.get_ref(), &edit).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Salary entry saved",
        "year": edit.year.key(),
        "month": edit.month.to_string()
    })))
}

/// Delete one academic year of salaries for everyone (admin only)
///
/// Irreversible. `confirm` must repeat the year key. All records lose the
/// year together or none does.
#[utoipa::path(
    delete,
    path = "/api/salaries",
    params(ResetQuery),
    responses(
        (status = 200, description = "Year removed from every record", body = Object, example = json!({
            "message": "Salary ledger reset",
            "year": "academic_2024-2025",
            "records": 42
        })),
        (status = 400, description = "Missing or mismatched confirmation"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Rolled back, nothing changed"),
        (status = 503, description = "Document store unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Salaries"
)]
pub async fn reset_salaries(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    query: web::Query<ResetQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let year = resolve_year(query.year.as_deref())?;
    if query.confirm.as_deref() != Some(year.key().as_str()) {
        return Err(ApiError::BadRequest(format!(
            "Resetting salaries is irreversible; repeat `{year}` in `confirm` to proceed"
        )));
    }

    let mut people = Vec::new();
    for kind in [PersonKind::Teacher, PersonKind::Employee] {
        let documents = store.query(kind.collection()).await?;
        people.extend(documents.iter().map(|doc| Person::from_document(kind, doc)));
    }

    warn!(year = %year, by = %auth.subject, records = people.len(), "Salary ledger reset requested");
    let records = ledger::reset_year(store.get_ref(), year, &people).await?;
    info!(year = %year, records, "Salary ledger reset done");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Salary ledger reset",
        "year": year.key(),
        "records": records
    })))
}
