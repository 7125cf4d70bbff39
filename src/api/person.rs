use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::model::{Person, PersonKind};
use crate::store::DocumentStore;
use crate::utils::field_updates::{build_field_updates, build_new_person};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PersonQuery {
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    #[schema(example = 20)]
    pub per_page: Option<u32>,
    #[schema(example = "haddad")]
    /// Case-insensitive match on the full name
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PersonListResponse {
    #[schema(value_type = Vec<Object>, example = json!([{
        "id": "4b0e6a1c-2f0a-4a57-9d7e-3f0f5d1c2b11",
        "kind": "teacher",
        "fullName": "Amal Haddad",
        "salaries": {},
        "absences": {},
        "leaves": {},
        "subjects": ["math"]
    }]))]
    pub data: Vec<Person>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: usize,
}

pub(crate) fn kind_from_path(collection: &str) -> Result<PersonKind, ApiError> {
    PersonKind::from_collection(collection)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown collection `{collection}`")))
}

pub(crate) async fn load_person(store: &dyn DocumentStore, kind: PersonKind, id: &str) -> Result<Person, ApiError> {
    let document = store
        .get(kind.collection(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{} not found", kind.as_ref())))?;

    Ok(Person::from_document(kind, &document))
}

/// Create teacher or employee
#[utoipa::path(
    post,
    path = "/api/{kind}",
    params(
        ("kind" = String, Path, description = "`teachers` or `employees`")
    ),
    request_body(
        content = Object,
        description = "Record fields; `fullName` is required, other fields are stored as given",
        example = json!({"fullName": "Amal Haddad", "phone": "0550 12 34 56", "subjects": ["math"]})
    ),
    responses(
        (status = 201, description = "Record created", body = Object),
        (status = 400, description = "Invalid payload", body = Object, example = json!({
            "message": "fullName is required"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Document store unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Persons"
)]
pub async fn create_person(
    _auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let kind = kind_from_path(&path)?;
    let record = build_new_person(&body)?;

    let document = store.insert(kind.collection(), record).await?;
    info!(kind = %kind, id = %document.id, "Person created");

    Ok(HttpResponse::Created().json(Person::from_document(kind, &document)))
}

/// List teachers or employees
#[utoipa::path(
    get,
    path = "/api/{kind}",
    params(
        ("kind" = String, Path, description = "`teachers` or `employees`"),
        PersonQuery
    ),
    responses(
        (status = 200, description = "Paginated list", body = PersonListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Persons"
)]
pub async fn list_persons(
    _auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
    query: web::Query<PersonQuery>,
) -> Result<HttpResponse, ApiError> {
    let kind = kind_from_path(&path)?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = ((page - 1) * per_page) as usize;

    let needle = query.search.as_deref().map(str::to_lowercase);

    let mut people: Vec<Person> = store
        .query(kind.collection())
        .await?
        .iter()
        .map(|doc| Person::from_document(kind, doc))
        .filter(|person| {
            needle
                .as_deref()
                .is_none_or(|needle| person.full_name.to_lowercase().contains(needle))
        })
        .collect();
    people.sort_by(|a, b| a.full_name.cmp(&b.full_name).then_with(|| a.id.cmp(&b.id)));

    let total = people.len();
    debug!(kind = %kind, total, page, per_page, "Listing persons");

    let data = people.into_iter().skip(offset).take(per_page as usize).collect();

    Ok(HttpResponse::Ok().json(PersonListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Get teacher or employee by id
#[utoipa::path(
    get,
    path = "/api/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "`teachers` or `employees`"),
        ("id" = String, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "Record found", body = Object),
        (status = 404, description = "Record not found", body = Object, example = json!({
            "message": "teacher not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Persons"
)]
pub async fn get_person(
    _auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (collection, id) = path.into_inner();
    let kind = kind_from_path(&collection)?;

    let person = load_person(store.get_ref(), kind, &id).await?;
    Ok(HttpResponse::Ok().json(person))
}

/// Update teacher or employee
///
/// Only the fields present in the body change. Salaries, absences and leaves
/// have their own endpoints.
#[utoipa::path(
    put,
    path = "/api/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "`teachers` or `employees`"),
        ("id" = String, Path, description = "Record id")
    ),
    request_body(content = Object, example = json!({"phone": "0661 00 11 22"})),
    responses(
        (status = 200, description = "Record updated", body = Object),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Persons"
)]
pub async fn update_person(
    _auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<(String, String)>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let (collection, id) = path.into_inner();
    let kind = kind_from_path(&collection)?;
    let updates = build_field_updates(&body)?;

    store.update_fields(kind.collection(), &id, updates).await?;

    let person = load_person(store.get_ref(), kind, &id).await?;
    Ok(HttpResponse::Ok().json(person))
}

/// Delete teacher or employee
#[utoipa::path(
    delete,
    path = "/api/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "`teachers` or `employees`"),
        ("id" = String, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Persons"
)]
pub async fn delete_person(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (collection, id) = path.into_inner();
    let kind = kind_from_path(&collection)?;

    store.delete(kind.collection(), &id).await?;
    info!(kind = %kind, id = %id, by = %auth.subject, "Person deleted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
