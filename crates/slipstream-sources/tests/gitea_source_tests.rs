//! Tests for the Gitea releases backend

mod common;

use common::*;
use serde_json::json;
use slipstream_core::noop_progress;
use slipstream_sources::{GiteaSource, UpdateSource};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gitea_source(server: &MockServer, token: Option<&str>) -> GiteaSource {
    GiteaSource::new(
        &format!("{}/acme/myapp", server.uri()),
        token.map(String::from),
        false,
    )
    .unwrap()
}

fn release_body(server: &MockServer, manifest: &str) -> serde_json::Value {
    json!([{
        "tag_name": "v1.0",
        "draft": false,
        "prerelease": false,
        "published_at": "2026-01-02T03:04:05Z",
        "assets": [
            asset_json(server, "RELEASES", "application/octet-stream", manifest.len()),
            asset_json(server, "MyApp.1.0-full.package", "application/octet-stream", FULL_PACKAGE_BYTES.len()),
        ],
    }])
}

#[tokio::test]
async fn feed_works_without_a_token() {
    let server = MockServer::start().await;
    let manifest = single_full_manifest("1.0");
    mount_gitea_releases(&server, "acme", "myapp", release_body(&server, &manifest)).await;
    mount_asset(&server, "RELEASES", manifest.as_bytes()).await;

    let entries = gitea_source(&server, None)
        .get_release_feed(None, None)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].package_id, APP_ID);
}

#[tokio::test]
async fn download_sends_the_token_header() {
    let server = MockServer::start().await;
    let manifest = single_full_manifest("1.0");
    mount_gitea_releases(&server, "acme", "myapp", release_body(&server, &manifest)).await;
    mount_asset(&server, "RELEASES", manifest.as_bytes()).await;
    Mock::given(method("GET"))
        .and(path("/assets/MyApp.1.0-full.package"))
        .and(header("Authorization", "token secret"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FULL_PACKAGE_BYTES.to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let source = gitea_source(&server, Some("secret"));
    let entries = source.get_release_feed(None, None).await.unwrap();

    let out = tempfile::tempdir().unwrap();
    let dest = out.path().join(&entries[0].filename);
    source
        .download_release_entry(&entries[0], &dest, noop_progress())
        .await
        .unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), FULL_PACKAGE_BYTES);
}
