mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use common::{BrokenStore, CannedModel, EARBUDS_ANSWER, service_with};
use qwickfiche::{ModelError, SheetPipeline, SheetService};
use qwickfiche::server::{USER_HEADER, router};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(model: Arc<CannedModel>) -> Router {
    router(Arc::new(service_with(model)), None)
}

fn post_form(user: Option<&str>, body: Value) -> Request<Body> {
    let mut request = Request::post("/api/sheets").header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        request = request.header(USER_HEADER, user);
    }
    request.body(Body::from(body.to_string())).unwrap()
}

fn post_json(path: &str, body: &Value) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(path: &str, user: &str) -> Request<Body> {
    Request::get(path).header(USER_HEADER, user).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let response = app(CannedModel::answering(EARBUDS_ANSWER))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn generate_then_export() {
    let app = app(CannedModel::answering(EARBUDS_ANSWER));

    let response = app
        .clone()
        .oneshot(post_form(
            Some("alice"),
            json!({ "productName": "Wireless Earbuds", "description": "noise-cancelling", "language": "en" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["sheet"]["category"], "Electronics");
    assert_eq!(created["warnings"], json!([]));
    let id = created["record_id"].as_str().unwrap().to_string();

    let listed = body_json(app.clone().oneshot(get("/api/sheets", "alice")).await.unwrap()).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["generated_title"], created["sheet"]["title"]);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/sheets/{id}/export.json"), "alice"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("fiche-produit-") && disposition.ends_with(".json\""));
    assert_eq!(body_json(response).await, created["sheet"]);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/sheets/{id}/export.pdf"), "alice"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("product_sheet.pdf")
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn empty_name_is_a_validation_error() {
    let model = CannedModel::answering(EARBUDS_ANSWER);
    let response = app(model.clone())
        .oneshot(post_form(Some("alice"), json!({ "productName": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "validation_error");
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn failures_map_to_distinct_statuses() {
    let cases = [
        (CannedModel::failing(ModelError::Transport("down".into())), StatusCode::BAD_GATEWAY, "model_unreachable"),
        (
            CannedModel::failing(ModelError::Auth { status: 401, message: "bad key".into() }),
            StatusCode::BAD_GATEWAY,
            "model_auth",
        ),
        (CannedModel::failing(ModelError::Quota("slow down".into())), StatusCode::TOO_MANY_REQUESTS, "model_quota"),
        (CannedModel::answering("no sheet today"), StatusCode::UNPROCESSABLE_ENTITY, "schema_violation"),
    ];

    for (model, status, code) in cases {
        let response = app(model)
            .oneshot(post_form(None, json!({ "productName": "Earbuds" })))
            .await
            .unwrap();
        assert_eq!(response.status(), status);
        assert_eq!(body_json(response).await["error"], code);
    }
}

#[tokio::test]
async fn saved_sheets_require_a_user() {
    let app = app(CannedModel::answering(EARBUDS_ANSWER));

    let response = app
        .clone()
        .oneshot(Request::get("/api/sheets").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(get("/api/sheets/unknown", "alice")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn records_can_be_deleted() {
    let app = app(CannedModel::answering(EARBUDS_ANSWER));
    let created = body_json(
        app.clone()
            .oneshot(post_form(Some("alice"), json!({ "productName": "Earbuds" })))
            .await
            .unwrap(),
    )
    .await;
    let id = created["record_id"].as_str().unwrap();

    let delete = Request::delete(format!("/api/sheets/{id}"))
        .header(USER_HEADER, "alice")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.clone().oneshot(delete).await.unwrap().status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(get(&format!("/api/sheets/{id}"), "alice")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn concurrent_submission_gets_conflict() {
    let app = app(CannedModel::slow(EARBUDS_ANSWER, std::time::Duration::from_millis(200)));

    let first = app.clone().oneshot(post_form(Some("alice"), json!({ "productName": "Earbuds" })));
    let second = async {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        app.clone()
            .oneshot(post_form(Some("alice"), json!({ "productName": "Earbuds" })))
            .await
    };

    let (first, second) = futures::future::join(first, second).await;
    assert_eq!(first.unwrap().status(), StatusCode::CREATED);
    let second = second.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["error"], "generation_in_progress");
}

#[tokio::test]
async fn unsaved_sheet_can_still_be_exported() {
    let pipeline = SheetPipeline::new(CannedModel::answering(EARBUDS_ANSWER)).unwrap();
    let app = router(Arc::new(SheetService::new(pipeline, Arc::new(BrokenStore))), None);

    let response = app
        .clone()
        .oneshot(post_form(Some("alice"), json!({ "productName": "Earbuds" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert!(created.get("record_id").is_none());
    assert_eq!(created["warnings"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(post_json("/api/export.json", &created["sheet"]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("fiche-produit-"));
    assert_eq!(body_json(response).await, created["sheet"]);

    let response = app
        .oneshot(post_json("/api/export.pdf", &created["sheet"]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn pdf_export_can_pick_a_translation() {
    let app = app(CannedModel::answering(EARBUDS_ANSWER));
    let content = json!({
        "title": "Lampe Aurora",
        "description": "Une lampe LED.",
        "features": ["USB-C"],
        "benefits": ["Moins de fatigue"],
        "priceSuggestion": "49 EUR",
        "seoTags": ["lampe", "led", "bureau", "usb-c", "variable"],
        "category": "Maison",
        "cta": "Commandez-la"
    });
    let mut sheet = content.clone();
    sheet["translations"] = json!({ "en": content });

    let response = app
        .clone()
        .oneshot(post_json("/api/export.pdf?language=en", &sheet))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    let response = app
        .oneshot(post_json("/api/export.pdf?language=de", &sheet))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "validation_error");
}

#[tokio::test]
async fn malformed_forms_get_json_validation_errors() {
    let model = CannedModel::answering(EARBUDS_ANSWER);
    let app = app(model.clone());

    for body in [json!({}), json!({ "productName": "Mug", "language": "de" }), json!(["Mug"])] {
        let response = app.clone().oneshot(post_form(Some("alice"), body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_json(response).await["error"], "validation_error");
    }

    let response = app
        .oneshot(post_json("/api/export.json", &json!({ "title": "only a title" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "validation_error");
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn concurrent_anonymous_submissions_both_succeed() {
    let model = CannedModel::slow(EARBUDS_ANSWER, std::time::Duration::from_millis(200));
    let app = app(model.clone());

    let first = app.clone().oneshot(post_form(None, json!({ "productName": "Earbuds" })));
    let second = async {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        app.clone().oneshot(post_form(None, json!({ "productName": "Mug" }))).await
    };

    let (first, second) = futures::future::join(first, second).await;
    assert_eq!(first.unwrap().status(), StatusCode::CREATED);
    assert_eq!(second.unwrap().status(), StatusCode::CREATED);
    assert_eq!(model.call_count(), 2);
}
