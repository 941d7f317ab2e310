//! HttpStore against a mock registry service.

use httpmock::prelude::*;
use mreg_artifacts::{Artifact, ArtifactRef, ArtifactStore, Metadata, RegistryPath, StoreError};
use mreg_store_http::HttpStore;
use serde_json::json;

fn artifact(version: u32, accuracy: f64) -> Artifact {
    Artifact::new("acme", "mnist", "mnist-model", version, Metadata::new().with("accuracy", accuracy))
}

fn store(server: &MockServer) -> HttpStore {
    HttpStore::new(&server.base_url(), "acme", "mnist", "test-key").unwrap()
}

#[test]
fn list_collection_sends_bearer_and_sorts_by_version() {
    let server = MockServer::start();
    let body = json!([artifact(2, 0.9), artifact(0, 0.7), artifact(1, 0.8)]);
    let m = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/acme/mnist/collections/mnist-model/artifacts")
            .header("authorization", "Bearer test-key");
        then.status(200).json_body(body);
    });

    let listed = store(&server).list_collection("mnist-model").unwrap();

    m.assert();
    let versions: Vec<u32> = listed.iter().map(|a| a.version).collect();
    assert_eq!(versions, vec![0, 1, 2]);
    assert_eq!(listed[2].metadata.metric("accuracy"), Some(0.9));
}

#[test]
fn unknown_collection_lists_empty() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/acme/mnist/collections/ghost/artifacts");
        then.status(404);
    });

    assert!(store(&server).list_collection("ghost").unwrap().is_empty());
}

#[test]
fn fetch_maps_404_to_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/acme/mnist/artifacts/mnist-model:v9");
        then.status(404);
    });

    let reference = ArtifactRef::parse("acme/mnist/mnist-model:9").unwrap();
    let err = store(&server).fetch(&reference).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn fetch_decodes_artifact() {
    let server = MockServer::start();
    let expected = artifact(3, 0.97).with_aliases(["latest"]);
    let body = json!(expected);
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/acme/mnist/artifacts/mnist-model:latest");
        then.status(200).json_body(body);
    });

    let reference = ArtifactRef::parse("acme/mnist/mnist-model:latest").unwrap();
    let got = store(&server).fetch(&reference).unwrap();
    assert_eq!(got, expected);
}

#[test]
fn link_posts_target_and_aliases() {
    let server = MockServer::start();
    let a = artifact(1, 0.8);
    let m = server.mock(|when, then| {
        when.method(POST).path("/api/v1/links").json_body(json!({
            "artifact_id": a.id,
            "source": "acme/mnist/mnist-model:v1",
            "target": "acme/model-registry/mnist-model",
            "aliases": ["best", "staging"],
        }));
        then.status(201);
    });

    store(&server)
        .link(
            &a,
            &RegistryPath::new("acme", "mnist-model"),
            &["best".to_string(), "staging".to_string()],
        )
        .unwrap();
    m.assert();
}

#[test]
fn save_puts_artifact_and_surfaces_api_errors() {
    let server = MockServer::start();
    let a = artifact(1, 0.8);
    server.mock(|when, then| {
        when.method(PUT).path("/api/v1/acme/mnist/artifacts/mnist-model:v1");
        then.status(503).body("registry read-only");
    });

    let err = store(&server).save(&a).unwrap_err();
    assert_eq!(
        err,
        StoreError::Api {
            status: 503,
            message: "registry read-only".to_string()
        }
    );
}

#[test]
fn malformed_body_is_decode_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/acme/mnist/collections/mnist-model/artifacts");
        then.status(200).body("{\"not\": \"a list\"}");
    });

    let err = store(&server).list_collection("mnist-model").unwrap_err();
    assert!(matches!(err, StoreError::Decode(_)));
}

#[test]
fn unreachable_registry_is_transport_error() {
    // Port 9 (discard) on localhost is not served by anything in CI.
    let store = HttpStore::new("http://127.0.0.1:9", "acme", "mnist", "k").unwrap();
    let err = store.list_collection("m").unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
}
