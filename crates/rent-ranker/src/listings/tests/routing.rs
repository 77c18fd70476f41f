use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::listings::collaborators::RawListing;
use crate::listings::settings::WeightConfigHolder;
use crate::listings::ListingService;

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

fn seeded_router() -> axum::Router {
    let (service, _, _) = build_service();
    seed(&service, sample_payloads());
    router_with_service(service)
}

#[tokio::test]
async fn create_route_returns_created_listing() {
    let router = router_with_service(build_service().0);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/listings",
            json!({"address": "5 Linden St", "price": "$950", "bedrooms": "1"}),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["listing"]["id"], json!(1));
    assert_eq!(payload["listing"]["price"], json!(950.0));
    assert_eq!(payload["listing"]["cost_per_sqft"], Value::Null);
    let score = payload["listing"]["score"].as_f64().expect("lone listing is scored");
    assert!((score - 0.75).abs() < 1e-9, "expected 0.75, got {score}");
}

#[tokio::test]
async fn create_route_rejects_duplicates_and_missing_addresses() {
    let router = seeded_router();

    let duplicate = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/listings",
            json!({"address": "22 cedar ct"}),
        ))
        .await
        .expect("route executes");
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let missing = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/listings",
            json!({"price": 1000}),
        ))
        .await
        .expect("route executes");
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(missing).await;
    assert!(payload["error"].as_str().is_some());
}

#[tokio::test]
async fn list_route_sorts_and_filters() {
    let router = seeded_router();

    let response = router
        .clone()
        .oneshot(empty_request(
            Method::GET,
            "/api/v1/listings?sort_by=price&group=blue",
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["sort_by"], json!("price"));
    let prices: Vec<Value> = payload["listings"]
        .as_array()
        .expect("listings array")
        .iter()
        .map(|listing| listing["price"].clone())
        .collect();
    assert_eq!(prices, vec![json!(1200.0), json!(2100.0)]);

    let bad_sort = router
        .oneshot(empty_request(Method::GET, "/api/v1/listings?sort_by=vibes"))
        .await
        .expect("route executes");
    assert_eq!(bad_sort.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_route_reports_changes_and_issues() {
    let router = seeded_router();

    let response = router
        .oneshot(json_request(
            Method::PATCH,
            "/api/v1/listings",
            json!({"id": 1, "price": "", "overall_rating": 15, "comments": "Quiet street"}),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["listing"]["price"], json!(1000.0));
    assert_eq!(payload["listing"]["overall_rating"], json!(5));
    assert_eq!(payload["changed"], json!(["comments"]));
    assert_eq!(payload["issues"][0]["kind"], json!("rating_reset"));
}

#[tokio::test]
async fn patch_route_requires_an_id() {
    let router = seeded_router();

    let response = router
        .oneshot(json_request(
            Method::PATCH,
            "/api/v1/listings",
            json!({"price": 10}),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_and_delete_routes_map_missing_listings_to_not_found() {
    let router = seeded_router();

    let found = router
        .clone()
        .oneshot(empty_request(Method::GET, "/api/v1/listings/2"))
        .await
        .expect("route executes");
    assert_eq!(found.status(), StatusCode::OK);
    let payload = read_json_body(found).await;
    assert_eq!(payload["address"], json!("22 Cedar Ct"));

    let deleted = router
        .clone()
        .oneshot(empty_request(Method::DELETE, "/api/v1/listings/2"))
        .await
        .expect("route executes");
    assert_eq!(deleted.status(), StatusCode::OK);

    let gone = router
        .oneshot(empty_request(Method::GET, "/api/v1/listings/2"))
        .await
        .expect("route executes");
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_routes_update_single_fields() {
    let router = seeded_router();

    let contacted = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/listings/1/contacted",
            json!({"selected": true}),
        ))
        .await
        .expect("route executes");
    assert_eq!(contacted.status(), StatusCode::OK);
    let payload = read_json_body(contacted).await;
    assert_eq!(payload["listing"]["contacted"], json!(true));

    let group = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/listings/1/group",
            json!({"group": "yellow"}),
        ))
        .await
        .expect("route executes");
    let payload = read_json_body(group).await;
    assert_eq!(payload["listing"]["group"], json!("yellow"));

    let bad_group = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/listings/1/group",
            json!({"group": "orange"}),
        ))
        .await
        .expect("route executes");
    assert_eq!(bad_group.status(), StatusCode::BAD_REQUEST);

    let comments = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/listings/9/comments",
            json!({"comments": "hello"}),
        ))
        .await
        .expect("route executes");
    assert_eq!(comments.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn applied_handler_sets_flag() {
    let (service, repository, _) = build_service();
    let ids = seed(&service, sample_payloads());

    let response = crate::listings::router::applied_handler::<MemoryRepository, MemorySettings>(
        State(Arc::new(service)),
        Path(ids[1].0),
        axum::Json(serde_json::from_value(json!({"selected": true})).expect("body")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(repository.stored(ids[1]).is_some_and(|listing| listing.applied));
}

#[tokio::test]
async fn settings_routes_validate_weights() {
    let router = seeded_router();

    let current = router
        .clone()
        .oneshot(empty_request(Method::GET, "/api/v1/settings"))
        .await
        .expect("route executes");
    let payload = read_json_body(current).await;
    assert_eq!(payload["rent"], json!(0.3));
    assert_eq!(payload["reference_address"], json!(REFERENCE_ADDRESS));

    let rejected = router
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/api/v1/settings",
            json!({"rent": 0.5, "sqft": 0.5, "beds": 0.5, "baths": 0, "distance": 0}),
        ))
        .await
        .expect("route executes");
    assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let unchanged = router
        .clone()
        .oneshot(empty_request(Method::GET, "/api/v1/settings"))
        .await
        .expect("route executes");
    assert_eq!(read_json_body(unchanged).await["rent"], json!(0.3));

    let accepted = router
        .oneshot(json_request(
            Method::PUT,
            "/api/v1/settings",
            json!({
                "rent_weight": 0.4,
                "sqft_weight": 0.2,
                "bedrooms_weight": 0.2,
                "bathrooms_weight": 0.1,
                "distance_weight": 0.1,
                "address": "9 Library Sq",
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(accepted.status(), StatusCode::OK);
    let payload = read_json_body(accepted).await;
    assert_eq!(payload["rent"], json!(0.4));
    assert_eq!(payload["reference_address"], json!("9 Library Sq"));
}

#[tokio::test]
async fn store_failures_become_internal_errors() {
    let holder = WeightConfigHolder::load(Arc::new(MemorySettings::default()), default_config());
    let service = ListingService::new(
        Arc::new(UnavailableRepository),
        holder,
        Arc::new(TableDistances::default()),
    );
    let router = crate::listings::listing_router(Arc::new(service));

    let response = router
        .oneshot(empty_request(Method::GET, "/api/v1/listings"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn extract_route_creates_from_pasted_page() {
    let (service, _, _) = build_service();
    let service = service.with_extractor(Arc::new(FixedExtractor(RawListing {
        address: Some("77 Spruce St".to_string()),
        price: Some("$1,725/mo".to_string()),
        ..RawListing::default()
    })));
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/listings/extract",
            json!({"url": "https://listings.example/77-spruce", "content": "<html></html>"}),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["listing"]["address"], json!("77 Spruce St"));
    assert_eq!(payload["listing"]["url"], json!("https://listings.example/77-spruce"));
}

#[tokio::test]
async fn extract_route_without_extractor_is_not_implemented() {
    let router = router_with_service(build_service().0);

    let missing_source = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/listings/extract",
            json!({"url": "  ", "content": ""}),
        ))
        .await
        .expect("route executes");
    assert_eq!(missing_source.status(), StatusCode::BAD_REQUEST);

    let unconfigured = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/listings/extract",
            json!({"url": "https://listings.example/1"}),
        ))
        .await
        .expect("route executes");
    assert_eq!(unconfigured.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn unparseable_page_is_unprocessable() {
    let (service, repository, _) = build_service();
    let router = router_with_service(service.with_extractor(Arc::new(BrokenExtractor)));

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/listings/extract",
            json!({"content": "<html>captcha</html>"}),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(repository.stored(crate::listings::ListingId(1)).is_none());
}

#[tokio::test]
async fn spiel_routes_save_and_return_the_message() {
    let router = router_with_service(build_service().0);

    let empty = router
        .clone()
        .oneshot(empty_request(Method::GET, "/api/v1/spiel"))
        .await
        .expect("route executes");
    assert_eq!(empty.status(), StatusCode::OK);
    assert_eq!(read_json_body(empty).await, json!({"spiel": ""}));

    let missing = router
        .clone()
        .oneshot(json_request(Method::PUT, "/api/v1/spiel", json!({})))
        .await
        .expect("route executes");
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let saved = router
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/api/v1/spiel",
            json!({"spiel": "Hello! I'm a quiet grad student."}),
        ))
        .await
        .expect("route executes");
    assert_eq!(saved.status(), StatusCode::OK);

    let fetched = router
        .oneshot(empty_request(Method::GET, "/api/v1/spiel"))
        .await
        .expect("route executes");
    let payload = read_json_body(fetched).await;
    assert_eq!(payload["spiel"], json!("Hello! I'm a quiet grad student."));
}
