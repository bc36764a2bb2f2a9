mod support;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use stafacade::identity::IdentityStore;
use stafacade::persist::{PersistenceMode, ReferenceTable};
use stafacade::resolver::{Resolver, NOT_EXIST};
use stafacade::server::router;
use stafacade::translate::Translator;
use support::{abc123, def456, resolver, DeadUpstream, FakeUpstream, ROOT};
use tower::ServiceExt;

fn app() -> Router {
    let (resolver, _) = resolver();
    router(Arc::new(resolver))
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn service_root_lists_every_entity_set() {
    let (status, body) = get(app(), "/v1.1").await;
    assert_eq!(status, StatusCode::OK);
    let root: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(root["serverSettings"]["conformance"].as_array().unwrap().len(), 2);
    let sets = root["value"].as_array().unwrap();
    assert_eq!(sets.len(), 8);
    assert_eq!(sets[0]["name"], "Things");
    assert_eq!(sets[0]["url"], format!("{ROOT}/Things"));
}

#[tokio::test]
async fn thing_over_http() {
    let (status, body) = get(app(), "/v1.1/Things(abc123)").await;
    assert_eq!(status, StatusCode::OK);
    let thing: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(thing["@iot.id"], "abc123");
}

#[tokio::test]
async fn raw_values_are_plain_text() {
    let (status, body) = get(app(), "/v1.1/Things(abc123)/name/$value").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "B1");
}

#[tokio::test]
async fn messages_are_ordinary_replies() {
    let (status, body) = get(app(), "/v1.1/Widgets(1)").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, NOT_EXIST);
}

#[tokio::test]
async fn upstream_not_found_maps_to_404() {
    let (status, body) = get(app(), "/v1.1/Things(zzz)").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("error"));
}

#[tokio::test]
async fn unreachable_upstream_maps_to_502() {
    let store = Arc::new(IdentityStore::open(&PersistenceMode::InMemory).unwrap());
    let resolver = Resolver::new(Arc::new(DeadUpstream), Translator::new(ROOT, store));
    let (status, _) = get(router(Arc::new(resolver)), "/v1.1/Things").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn corrupt_reference_table_maps_to_500() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("references.json");
    std::fs::write(&path, "{ not json").unwrap();
    let store = Arc::new(IdentityStore::open(&PersistenceMode::Json(path)).unwrap());
    let upstream = FakeUpstream::new(vec![abc123()]);
    let resolver = Resolver::new(Arc::new(upstream), Translator::new(ROOT, store));
    let (status, body) = get(router(Arc::new(resolver)), "/v1.1/Datastreams(1)").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Persistence error"), "{body}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_datastream_listings_share_one_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("references.json");
    let store = Arc::new(IdentityStore::open(&PersistenceMode::Json(path.clone())).unwrap());
    let upstream = FakeUpstream::new(vec![abc123(), def456()]);
    let app = router(Arc::new(Resolver::new(Arc::new(upstream), Translator::new(ROOT, store))));
    let requests: Vec<_> = (0..8)
        .map(|_| tokio::spawn(get(app.clone(), "/v1.1/Datastreams")))
        .collect();
    let mut listings = Vec::new();
    for request in requests {
        let (status, body) = request.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        let listing: Value = serde_json::from_str(&body).unwrap();
        listings.push(listing);
    }
    assert_eq!(listings[0]["@iot.count"], 5);
    assert!(listings.windows(2).all(|w| w[0] == w[1]));
    let table: ReferenceTable = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(table.len(), 5);
}
