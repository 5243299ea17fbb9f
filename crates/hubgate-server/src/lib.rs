//! HTTP façade for hubgate.
//!
//! Exposes a small JSON API over the upstream source-control API: tree and
//! file reads at any ref, branch and commit writes, pull requests, and a
//! push webhook that keeps the tree cache honest. Every ref a caller passes
//! goes through [`hubgate_refs::RefResolver`].

pub mod config;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod reshape;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use hooks::WebhookVerifier;
pub use router::{build_router, endpoints, AppState};
pub use server::HubgateServer;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use hubgate_upstream::{Method, ScriptedUpstream, UpstreamError};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    const BASE: &str = "/repos/Cognify-source/Koppsnipern";
    const COMMIT: &str = "7638417db6d59f3c431d3e1f261cc637155684cd";
    const TREE: &str = "691272480426f78a0138979dd3ce63b77f706feb";
    const BLOB: &str = "3d21ec53a331a6f037a91c368710b99387d012c1";
    const NEW_COMMIT: &str = "1111111111111111111111111111111111111111";
    const NEW_TREE: &str = "2222222222222222222222222222222222222222";

    fn p(suffix: &str) -> String {
        format!("{BASE}/{suffix}")
    }

    fn pointer(kind: &str, sha: &str) -> Value {
        json!({ "object": { "type": kind, "sha": sha } })
    }

    fn app_with(config: ServerConfig) -> (Arc<ScriptedUpstream>, Router) {
        let upstream = Arc::new(ScriptedUpstream::new());
        let state = AppState::new(&config, upstream.clone()).unwrap();
        (upstream, build_router(state))
    }

    fn app() -> (Arc<ScriptedUpstream>, Router) {
        app_with(ServerConfig::default())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn script_main_tree(upstream: &ScriptedUpstream) {
        upstream
            .on_get(&p("git/ref/main"), pointer("commit", COMMIT))
            .on_get(&p(&format!("git/commits/{COMMIT}")), json!({ "tree": { "sha": TREE } }))
            .on_get(
                &p(&format!("git/trees/{TREE}")),
                json!({
                    "sha": TREE,
                    "truncated": false,
                    "tree": [
                        { "path": "README.md", "type": "blob" },
                        { "path": "src", "type": "tree" },
                        { "path": "src/lib.rs", "type": "blob" }
                    ]
                }),
            );
    }

    #[tokio::test]
    async fn ping_endpoint() {
        let (upstream, app) = app();
        let (status, body) = send(&app, get("/ping")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "API is running");
        assert_eq!(body["tokenConfigured"], false);
        assert!(body["time"].as_str().is_some());
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn recursive_tree_resolves_default_branch() {
        let (upstream, app) = app();
        script_main_tree(&upstream);

        let (status, body) = send(&app, get("/tree")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ref"], "main");
        assert_eq!(body["tree"].as_array().unwrap().len(), 3);

        let calls = upstream.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].query, vec![("recursive".to_string(), "1".to_string())]);
    }

    #[tokio::test]
    async fn recursive_tree_filters_by_path() {
        let (upstream, app) = app();
        script_main_tree(&upstream);

        let (status, body) = send(&app, get("/tree?path=/src/&recursive=YES")).await;
        assert_eq!(status, StatusCode::OK);
        let paths: Vec<&str> = body["tree"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["path"].as_str())
            .collect();
        assert_eq!(paths, ["src", "src/lib.rs"]);
    }

    #[tokio::test]
    async fn tree_cache_skips_resolution_until_push() {
        let (upstream, app) = app();
        script_main_tree(&upstream);
        upstream.on_get(&p("git/ref/heads/main"), pointer("commit", COMMIT));

        send(&app, get("/tree")).await;
        send(&app, get("/tree")).await;
        assert_eq!(upstream.call_count(), 4);

        let push = json!({
            "ref": "refs/heads/main",
            "repository": { "name": "Koppsnipern", "owner": { "login": "Cognify-source" } }
        });
        let (status, _) = send(&app, with_json("POST", "/webhook/github", push)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(upstream.call_count(), 5);

        send(&app, get("/tree")).await;
        assert_eq!(upstream.call_count(), 8);
    }

    fn script_new_main_tree(upstream: &ScriptedUpstream) {
        upstream
            .on_get(&p("git/ref/main"), pointer("commit", NEW_COMMIT))
            .on_get(
                &p(&format!("git/commits/{NEW_COMMIT}")),
                json!({ "tree": { "sha": NEW_TREE } }),
            )
            .on_get(
                &p(&format!("git/trees/{NEW_TREE}")),
                json!({ "sha": NEW_TREE, "truncated": false, "tree": [] }),
            );
    }

    #[tokio::test]
    async fn own_commit_drops_cached_tree() {
        let (upstream, app) = app();
        script_main_tree(&upstream);
        upstream.on(Method::Put, &p("contents/a.md"), Ok(json!({ "commit": { "sha": NEW_COMMIT } })));

        let (_, body) = send(&app, get("/tree")).await;
        assert_eq!(body["sha"], TREE);

        let request = with_json(
            "PUT",
            "/commit",
            json!({ "path": "a.md", "message": "m", "content": "aGk=", "branch": "main" }),
        );
        assert_eq!(send(&app, request).await.0, StatusCode::OK);
        script_new_main_tree(&upstream);

        let (status, body) = send(&app, get("/tree?ref=main")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sha"], NEW_TREE);
    }

    #[tokio::test]
    async fn own_branch_writes_drop_cached_trees() {
        let (upstream, app) = app();
        upstream
            .on_get(&p("git/ref/feature"), pointer("commit", COMMIT))
            .on_get(&p(&format!("git/commits/{COMMIT}")), json!({ "tree": { "sha": TREE } }))
            .on_get(&p(&format!("git/trees/{TREE}")), json!({ "sha": TREE, "tree": [] }))
            .on(Method::Delete, &p("git/refs/heads/feature"), Ok(Value::Null));

        assert_eq!(send(&app, get("/tree?ref=feature")).await.0, StatusCode::OK);

        let request = with_json("DELETE", "/delete-branch", json!({ "branchName": "feature" }));
        assert_eq!(send(&app, request).await.0, StatusCode::OK);
        upstream.fail_get(&p("git/ref/feature"), UpstreamError::not_found("feature"));

        let (status, _) = send(&app, get("/tree?ref=feature")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        script_main_tree(&upstream);
        upstream.on(Method::Post, &p("git/refs"), Ok(json!({})));
        send(&app, get("/tree")).await;

        let request = with_json("POST", "/branch", json!({ "branchName": "next", "fromSha": COMMIT }));
        assert_eq!(send(&app, request).await.0, StatusCode::OK);
        script_new_main_tree(&upstream);

        let (_, body) = send(&app, get("/tree")).await;
        assert_eq!(body["sha"], NEW_TREE);
    }

    #[tokio::test]
    async fn merge_drops_cached_trees() {
        let (upstream, app) = app();
        script_main_tree(&upstream);
        upstream.on(Method::Put, &p("pulls/3/merge"), Ok(json!({ "merged": true })));
        send(&app, get("/tree")).await;

        let request = with_json("PUT", "/merge", json!({ "pull_number": 3 }));
        assert_eq!(send(&app, request).await.0, StatusCode::OK);
        script_new_main_tree(&upstream);

        let (_, body) = send(&app, get("/tree")).await;
        assert_eq!(body["sha"], NEW_TREE);
    }

    #[tokio::test]
    async fn disabled_cache_resolves_every_time() {
        let (upstream, app) = app_with(ServerConfig {
            tree_cache_ttl_secs: 0,
            ..Default::default()
        });
        script_main_tree(&upstream);

        send(&app, get("/tree")).await;
        send(&app, get("/tree")).await;
        assert_eq!(upstream.call_count(), 6);
    }

    #[tokio::test]
    async fn flat_tree_uses_contents_api() {
        let (upstream, app) = app();
        upstream.on_get(&p("contents/docs"), json!([{ "name": "intro.md" }]));

        let (status, body) =
            send(&app, get("/tree?path=docs&recursive=false&ref=dev&owner=&repo=")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "intro.md");

        let calls = upstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].query, vec![("ref".to_string(), "dev".to_string())]);
    }

    #[tokio::test]
    async fn tree_for_unknown_ref_is_404() {
        let (_, app) = app();
        let (status, body) = send(&app, get("/tree?ref=nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn file_is_decoded() {
        let (upstream, app) = app();
        upstream.on_get(
            &p("contents/src/lib.rs"),
            json!({
                "name": "lib.rs",
                "path": "src/lib.rs",
                "sha": BLOB,
                "size": 12,
                "encoding": "base64",
                "content": "aGVsbG8K\nd29ybGQK\n"
            }),
        );

        let (status, body) = send(&app, get("/file?path=src/lib.rs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], "hello\nworld\n");
        assert_eq!(body["line_count"], 3);
        assert_eq!(body["sha"], BLOB);
        assert_eq!(body["ref"], "default-branch");
        assert!(body["html_url"].is_null());
        assert!(upstream.calls()[0].query.is_empty());

        let (status, body) = send(&app, get("/file-linecount?path=src/lib.rs&ref=v1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "line_count": 3, "ref": "v1" }));
    }

    #[tokio::test]
    async fn file_requires_path_and_content() {
        let (upstream, app) = app();
        let (status, body) = send(&app, get("/file")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert_eq!(upstream.call_count(), 0);

        upstream.on_get(&p("contents/src"), json!([{ "name": "lib.rs" }]));
        let (status, _) = send(&app, get("/file-linecount?path=src")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upstream_errors_carry_their_body() {
        let (_, app) = app();
        let (status, body) = send(&app, get("/file?path=missing.txt")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["githubResponse"]["message"], "Not Found");
    }

    #[tokio::test]
    async fn transport_failure_is_500() {
        let (upstream, app) = app();
        upstream.fail_get(&p("branches"), UpstreamError::Transport("connection reset".into()));
        let (status, body) = send(&app, get("/branches")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["githubResponse"].is_null());
    }

    #[tokio::test]
    async fn create_branch_from_explicit_sha() {
        let (upstream, app) = app();
        upstream.on(Method::Post, &p("git/refs"), Ok(json!({ "ref": "refs/heads/feature/x" })));

        let request = with_json(
            "POST",
            "/branch",
            json!({ "branchName": "feature/x", "fromSha": COMMIT }),
        );
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ref"], "refs/heads/feature/x");

        let calls = upstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].body,
            Some(json!({ "ref": "refs/heads/feature/x", "sha": COMMIT }))
        );
    }

    #[tokio::test]
    async fn create_branch_resolves_from_ref() {
        let (upstream, app) = app();
        upstream
            .on_get(&p("git/ref/tags/v1.0"), pointer("tag", BLOB))
            .on_get(&p(&format!("git/tags/{BLOB}")), pointer("commit", COMMIT))
            .on(Method::Post, &p("git/refs"), Ok(json!({})));

        let request = with_json("POST", "/branch", json!({ "branchName": "hotfix", "fromRef": "v1.0" }));
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);

        let last = upstream.calls().pop().unwrap();
        assert_eq!(last.body.unwrap()["sha"], COMMIT);
    }

    #[tokio::test]
    async fn create_branch_defaults_to_default_head() {
        let (upstream, app) = app();
        upstream
            .on_get(&p("git/ref/heads/main"), pointer("commit", COMMIT))
            .on(Method::Post, &p("git/refs"), Ok(json!({})));

        let request = with_json("POST", "/branch", json!({ "branchName": "next" }));
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(upstream.call_paths(), [p("git/ref/heads/main"), p("git/refs")]);
    }

    #[tokio::test]
    async fn create_branch_validates_name() {
        let (upstream, app) = app();
        let (status, _) = send(&app, with_json("POST", "/branch", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = with_json("POST", "/branch", json!({ "branchName": "bad..name" }));
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("bad..name"));
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn branch_head_endpoint() {
        let (upstream, app) = app();
        upstream.on_get(&p("git/ref/heads/dev"), pointer("commit", COMMIT));

        let (status, body) = send(&app, get("/branch-head?branch=dev")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "branch": "dev", "head_sha": COMMIT }));

        let (status, _) = send(&app, get("/branch-head")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, get("/branch-head?branch=gone")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn commit_updates_existing_file() {
        let (upstream, app) = app();
        upstream
            .on_get(&p("contents/docs/a.md"), json!({ "sha": BLOB }))
            .on(Method::Put, &p("contents/docs/a.md"), Ok(json!({ "commit": { "sha": COMMIT } })));

        let request = with_json(
            "PUT",
            "/commit",
            json!({ "path": "docs/a.md", "message": "m", "content": "aGk=", "branch": "dev" }),
        );
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["commit"]["sha"], COMMIT);

        let calls = upstream.calls();
        assert_eq!(calls[0].query, vec![("ref".to_string(), "dev".to_string())]);
        assert_eq!(
            calls[1].body,
            Some(json!({ "message": "m", "content": "aGk=", "branch": "dev", "sha": BLOB }))
        );
    }

    #[tokio::test]
    async fn commit_creates_missing_file_without_sha() {
        let (upstream, app) = app();
        upstream.on(Method::Put, &p("contents/new.md"), Ok(json!({})));

        let request = with_json(
            "PUT",
            "/commit",
            json!({ "path": "new.md", "message": "m", "content": "aGk=", "branch": "dev" }),
        );
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        let put = upstream.calls().pop().unwrap();
        assert!(put.body.unwrap().get("sha").is_none());
    }

    #[tokio::test]
    async fn commit_with_sha_skips_lookup() {
        let (upstream, app) = app();
        upstream.on(Method::Put, &p("contents/a.md"), Ok(json!({})));

        let request = with_json(
            "PUT",
            "/commit",
            json!({ "path": "a.md", "message": "m", "content": "aGk=", "branch": "dev", "sha": BLOB }),
        );
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(upstream.call_count(), 1);

        let request = with_json("PUT", "/commit", json!({ "path": "a.md", "message": "m" }));
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn pull_request_defaults_to_ready() {
        let (upstream, app) = app();
        upstream.on(Method::Post, &p("pulls"), Ok(json!({ "number": 7 })));

        let request = with_json("POST", "/pull", json!({ "title": "t", "head": "dev", "base": "main" }));
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["number"], 7);
        assert_eq!(
            upstream.calls()[0].body,
            Some(json!({ "title": "t", "head": "dev", "base": "main", "draft": false }))
        );

        let (status, _) = send(&app, with_json("POST", "/pull", json!({ "title": "t" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn merge_validates_input() {
        let (upstream, app) = app();
        upstream.on(Method::Put, &p("pulls/7/merge"), Ok(json!({ "merged": true })));

        let request = with_json("PUT", "/merge", json!({ "pull_number": "7", "merge_method": "squash" }));
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["merged"], true);
        assert_eq!(upstream.calls()[0].body, Some(json!({ "merge_method": "squash" })));

        let request = with_json("PUT", "/merge", json!({ "pull_number": 7, "merge_method": "octopus" }));
        assert_eq!(send(&app, request).await.0, StatusCode::BAD_REQUEST);

        let request = with_json("PUT", "/merge", json!({ "pull_number": 0 }));
        assert_eq!(send(&app, request).await.0, StatusCode::BAD_REQUEST);
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test]
    async fn delete_branch_endpoint() {
        let (upstream, app) = app();
        upstream.on(Method::Delete, &p("git/refs/heads/feature/x"), Ok(Value::Null));

        let request = with_json("DELETE", "/delete-branch", json!({ "branchName": "feature/x" }));
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Branch 'feature/x' deleted successfully.");

        let (status, _) = send(&app, with_json("DELETE", "/delete-branch", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn branches_lists_names() {
        let (upstream, app) = app();
        upstream.on_get(&p("branches"), json!([{ "name": "main" }, { "name": "dev" }]));

        let (status, body) = send(&app, get("/branches?owner=Cognify-source")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "branches": ["main", "dev"] }));
        assert_eq!(
            upstream.calls()[0].query,
            vec![("per_page".to_string(), "100".to_string())]
        );
    }

    #[tokio::test]
    async fn other_repository_via_query() {
        let (upstream, app) = app();
        upstream.on_get("/repos/octo/hello/branches", json!([]));

        let (status, _) = send(&app, get("/branches?owner=octo&repo=hello")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(upstream.call_paths(), ["/repos/octo/hello/branches"]);
    }

    fn signed_app() -> (Arc<ScriptedUpstream>, Router, WebhookVerifier) {
        let secret = "s3cret";
        let (upstream, app) = app_with(ServerConfig {
            webhook_secret: Some(secret.into()),
            ..Default::default()
        });
        (upstream, app, WebhookVerifier::new(Some(secret)))
    }

    fn webhook(body: &str, signature: Option<String>, event: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhook/github")
            .header(hooks::EVENT_HEADER, event);
        if let Some(signature) = signature {
            builder = builder.header(hooks::SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn webhook_rejects_bad_signature() {
        let (upstream, app, _) = signed_app();
        let body = r#"{"ref":"refs/heads/main"}"#;

        let (status, response) = send(&app, webhook(body, None, "push")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(response, json!({ "error": "Invalid signature" }));

        let forged = Some(format!("sha256={}", "0".repeat(64)));
        let (status, _) = send(&app, webhook(body, forged, "push")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn webhook_reports_pushed_head() {
        let (upstream, app, verifier) = signed_app();
        upstream.on_get(&p("git/ref/heads/feature/login"), pointer("commit", COMMIT));
        let body = r#"{"ref":"refs/heads/feature/login"}"#;

        let (status, response) = send(&app, webhook(body, verifier.sign(body.as_bytes()), "push")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            response,
            json!({ "ok": true, "branch": "feature/login", "head": COMMIT })
        );
    }

    #[tokio::test]
    async fn webhook_query_ref_wins() {
        let (upstream, app) = app();
        upstream.on_get(&p("git/ref/heads/dev"), pointer("commit", COMMIT));

        let request = Request::builder()
            .method("POST")
            .uri("/webhook/github?ref=refs/heads/dev")
            .body(Body::from(r#"{"ref":"refs/heads/main"}"#))
            .unwrap();
        let (status, response) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["branch"], "dev");
    }

    #[tokio::test]
    async fn webhook_ping_event() {
        let (upstream, app, verifier) = signed_app();
        let body = r#"{"zen":"Keep it logically awesome."}"#;

        let (status, response) = send(&app, webhook(body, verifier.sign(body.as_bytes()), "ping")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["event"], "ping");
        assert_eq!(upstream.call_count(), 0);
    }
}
