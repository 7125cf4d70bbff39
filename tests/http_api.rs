mod common;

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use serde_json::{Value, json};

use common::{TestContext, YEAR, anonymous, authed};
use school_admin::model::Role;
use school_admin::store::{DocumentStore, MemoryStore};

async fn seeded() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .put(
            "teachers",
            "t1",
            json!({
                "fullName": "Amal Haddad",
                "subjects": ["math"],
                "salaries": {
                    "academic_2023-2024": {"9": {"amount": 400.0, "notes": ""}},
                    "academic_2024-2025": {"9": {"amount": 500.0, "notes": ""}}
                }
            }),
        )
        .await;
    store
        .put(
            "employees",
            "e1",
            json!({
                "fullName": "Karim Benali",
                "salaries": {"academic_2024-2025": {"9": {"amount": 300.0, "notes": ""}}}
            }),
        )
        .await;
    store
}

#[actix_web::test]
async fn requests_without_token_are_rejected() {
    let ctx = TestContext::start(seeded().await).await;
    let app = test::init_service(ctx.app()).await;

    let req = anonymous(TestRequest::get().uri("/api/teachers")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = anonymous(TestRequest::get().uri("/api/teachers"))
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], json!("Invalid or expired token"));

    let req = anonymous(TestRequest::get().uri("/api/teachers"))
        .insert_header(("Authorization", "Basic b2ZmaWNlOnB3"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], json!("Authorization header must start with Bearer"));
}

#[actix_web::test]
async fn person_lifecycle() {
    let ctx = TestContext::start(seeded().await).await;
    let app = test::init_service(ctx.app()).await;

    let req = authed(TestRequest::post().uri("/api/teachers"), Role::Staff)
        .set_json(json!({"fullName": "Nadia Cherif", "phone": "0550"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["kind"], json!("teacher"));
    assert_eq!(created["phone"], json!("0550"));

    let req = authed(TestRequest::put().uri(&format!("/api/teachers/{id}")), Role::Staff)
        .set_json(json!({"phone": "0661"}))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["phone"], json!("0661"));
    assert_eq!(updated["fullName"], json!("Nadia Cherif"));

    let req = authed(TestRequest::get().uri("/api/teachers?search=nadia"), Role::Staff).to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list["total"], json!(1));
    assert_eq!(list["data"][0]["id"], json!(id));

    let req = authed(TestRequest::delete().uri(&format!("/api/teachers/{id}")), Role::Staff).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = authed(TestRequest::get().uri(&format!("/api/teachers/{id}")), Role::Staff).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn ledger_fields_cannot_be_patched_directly() {
    let ctx = TestContext::start(seeded().await).await;
    let app = test::init_service(ctx.app()).await;

    let req = authed(TestRequest::put().uri("/api/teachers/t1"), Role::Staff)
        .set_json(json!({"salaries": {}}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = authed(TestRequest::put().uri("/api/teachers/t1"), Role::Staff)
        .set_json(json!({"kind": "employee"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = authed(TestRequest::get().uri("/api/teachers/t1"), Role::Staff).to_request();
    let person: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(person["kind"], json!("teacher"));

    let req = authed(TestRequest::post().uri("/api/employees"), Role::Staff)
        .set_json(json!({"phone": "0550"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn absence_days_are_recorded_and_removed() {
    let ctx = TestContext::start(seeded().await).await;
    let app = test::init_service(ctx.app()).await;

    let req = authed(TestRequest::put().uri("/api/teachers/t1/absences/2025-01-12"), Role::Staff)
        .set_json(json!({"notes": "sick"}))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["date"], json!("2025_01_12"));

    let req = authed(TestRequest::get().uri("/api/teachers/t1"), Role::Staff).to_request();
    let person: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(person["absences"]["2025_01_12"], json!({"notes": "sick"}));
    assert_eq!(person["leaves"], json!({}));

    let req = authed(TestRequest::delete().uri("/api/teachers/t1/absences/2025_01_12"), Role::Staff).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = authed(TestRequest::get().uri("/api/teachers/t1"), Role::Staff).to_request();
    let person: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(person["absences"], json!({}));

    let req = authed(TestRequest::put().uri("/api/teachers/t1/leaves/2025-02-30"), Role::Staff)
        .set_json(json!({"notes": ""}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn salary_cell_write_shows_in_table() {
    let ctx = TestContext::start(seeded().await).await;
    let mut watcher = ctx.reader();
    let app = test::init_service(ctx.app()).await;

    let req = authed(TestRequest::put().uri("/api/salaries/teachers/t1/11"), Role::Staff)
        .set_json(json!({"amount": 520.0, "notes": "raise", "year": YEAR}))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["month"], json!("11"));
    assert!(watcher.changed().await);

    let req = authed(TestRequest::get().uri(&format!("/api/salaries?year={YEAR}")), Role::Staff).to_request();
    let table: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(table["year"], json!(YEAR));
    assert_eq!(table["grand_total"], json!(1320.0));
    assert_eq!(table["teachers"]["total"], json!(1020.0));
    assert_eq!(table["employees"]["total"], json!(300.0));

    let cells = &table["teachers"]["rows"][0]["cells"];
    assert_eq!(cells[0]["entry"], json!({"amount": 500.0, "notes": ""}));
    assert_eq!(cells[1]["entry"], Value::Null);
    assert_eq!(cells[2]["entry"], json!({"amount": 520.0, "notes": "raise"}));
    assert_eq!(table["month_totals"][0]["total"], json!(800.0));
}

#[actix_web::test]
async fn fractional_salaries_add_up_to_the_cent() {
    let ctx = TestContext::start(seeded().await).await;
    let mut watcher = ctx.reader();
    let app = test::init_service(ctx.app()).await;

    for (uri, amount) in [
        ("/api/salaries/teachers/t1/9", 0.1),
        ("/api/salaries/teachers/t1/10", 0.7),
        ("/api/salaries/employees/e1/9", 0.2),
        ("/api/salaries/employees/e1/10", 0.3),
    ] {
        let req = authed(TestRequest::put().uri(uri), Role::Staff)
            .set_json(json!({"amount": amount, "year": YEAR}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        assert!(watcher.changed().await);
    }

    let req = authed(TestRequest::get().uri(&format!("/api/salaries?year={YEAR}")), Role::Staff).to_request();
    let table: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(table["grand_total"], json!(1.3));
    assert_eq!(table["month_totals"][0]["total"], json!(0.3));
    assert_eq!(table["month_totals"][1]["total"], json!(1.0));
    assert_eq!(table["teachers"]["total"], json!(0.8));
}

#[actix_web::test]
async fn salary_write_rejects_bad_input() {
    let ctx = TestContext::start(seeded().await).await;
    let app = test::init_service(ctx.app()).await;

    for (uri, body) in [
        ("/api/salaries/teachers/t1/13", json!({"amount": 1.0, "year": YEAR})),
        ("/api/salaries/teachers/t1/09", json!({"amount": 1.0, "year": YEAR})),
        ("/api/salaries/teachers/t1/9", json!({"amount": -5.0, "year": YEAR})),
        ("/api/salaries/teachers/t1/9", json!({"amount": 1.0e12, "year": YEAR})),
        ("/api/salaries/teachers/t1/9", json!({"amount": 1.0, "year": "2024-2025"})),
    ] {
        let req = authed(TestRequest::put().uri(uri), Role::Staff).set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
    }

    let req = authed(TestRequest::put().uri("/api/salaries/employees/ghost/9"), Role::Staff)
        .set_json(json!({"amount": 1.0, "year": YEAR}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn reset_is_admin_only_and_needs_confirmation() {
    let ctx = TestContext::start(seeded().await).await;
    let app = test::init_service(ctx.app()).await;
    let uri = format!("/api/salaries?year={YEAR}&confirm={YEAR}");

    let req = authed(TestRequest::delete().uri(&uri), Role::Staff).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = authed(TestRequest::delete().uri(&format!("/api/salaries?year={YEAR}")), Role::Admin).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = authed(
        TestRequest::delete().uri(&format!("/api/salaries?year={YEAR}&confirm=academic_2023-2024")),
        Role::Admin,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let teacher = ctx.store.get("teachers", "t1").await.unwrap().unwrap();
    assert!(teacher.body["salaries"].get(YEAR).is_some());

    let req = authed(TestRequest::delete().uri(&uri), Role::Admin).to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["records"], json!(2));

    let teacher = ctx.store.get("teachers", "t1").await.unwrap().unwrap();
    assert_eq!(
        teacher.body["salaries"],
        json!({"academic_2023-2024": {"9": {"amount": 400.0, "notes": ""}}})
    );
    let employee = ctx.store.get("employees", "e1").await.unwrap().unwrap();
    assert_eq!(employee.body["salaries"], json!({}));
}

#[actix_web::test]
async fn rolled_back_reset_is_a_conflict() {
    let ctx = TestContext::start(seeded().await).await;
    let app = test::init_service(ctx.app()).await;

    ctx.store.fail_next_batch_at(1);
    let req = authed(
        TestRequest::delete().uri(&format!("/api/salaries?year={YEAR}&confirm={YEAR}")),
        Role::Admin,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    for (collection, id) in [("teachers", "t1"), ("employees", "e1")] {
        let doc = ctx.store.get(collection, id).await.unwrap().unwrap();
        assert!(doc.body["salaries"].get(YEAR).is_some(), "{collection}/{id}");
    }
}

#[actix_web::test]
async fn store_outage_maps_to_service_unavailable() {
    let ctx = TestContext::start(seeded().await).await;
    let app = test::init_service(ctx.app()).await;

    ctx.store.set_unavailable(true);
    let req = authed(TestRequest::get().uri("/api/employees"), Role::Staff).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn unknown_collection_is_not_routed() {
    let ctx = TestContext::start(seeded().await).await;
    let app = test::init_service(ctx.app()).await;

    let req = authed(TestRequest::get().uri("/api/students"), Role::Staff).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
