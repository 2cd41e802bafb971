//! Wiremock setup helpers for source tests

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mount a RELEASES manifest under `/feed/RELEASES`
pub async fn mount_manifest(server: &MockServer, text: &str) {
    Mock::given(method("GET"))
        .and(path("/feed/RELEASES"))
        .respond_with(ResponseTemplate::new(200).set_body_string(text.to_string()))
        .mount(server)
        .await;
}

/// Mount a package file under `/feed/{name}`
pub async fn mount_package(server: &MockServer, name: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/feed/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

/// Mount a package that serves `wrong` once, then `content`
pub async fn mount_corrupt_then_fixed_package(
    server: &MockServer,
    name: &str,
    wrong: &[u8],
    content: &[u8],
) {
    Mock::given(method("GET"))
        .and(path(format!("/feed/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(wrong.to_vec()))
        .up_to_n_times(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/feed/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

/// JSON body for one hosted-release asset
pub fn asset_json(server: &MockServer, name: &str, content_type: &str, size: usize) -> Value {
    json!({
        "name": name,
        "url": format!("{}/assets/{name}", server.uri()),
        "browser_download_url": format!("{}/assets/{name}", server.uri()),
        "content_type": content_type,
        "size": size,
    })
}

/// Mount a hosted releases listing under the Enterprise API path
pub async fn mount_github_releases(server: &MockServer, owner: &str, repo: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v3/repos/{owner}/{repo}/releases")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount a releases listing under the Gitea API path
pub async fn mount_gitea_releases(server: &MockServer, owner: &str, repo: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/repos/{owner}/{repo}/releases")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount a hosted asset's bytes under `/assets/{name}`
pub async fn mount_asset(server: &MockServer, name: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/assets/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}
