use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use bytes::Bytes;
use hubgate_refs::validate_branch_name;
use hubgate_types::{ApiPath, RepositoryCoordinate};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{ServerError, ServerResult};
use crate::hooks::{pushed_branch, pushed_repository, EVENT_HEADER, SIGNATURE_HEADER};
use crate::reshape;
use crate::router::AppState;

const MERGE_METHODS: [&str; 3] = ["merge", "squash", "rebase"];

#[derive(Debug, Default, Deserialize)]
pub struct RepoQuery {
    pub owner: Option<String>,
    pub repo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TreeQuery {
    pub owner: Option<String>,
    pub repo: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub path: Option<String>,
    pub recursive: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    pub owner: Option<String>,
    pub repo: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BranchHeadQuery {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchBody {
    pub branch_name: Option<String>,
    pub from_sha: Option<String>,
    pub from_ref: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommitBody {
    pub path: Option<String>,
    pub message: Option<String>,
    /// Base64 file content, forwarded as is.
    pub content: Option<String>,
    pub branch: Option<String>,
    pub sha: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PullBody {
    pub title: Option<String>,
    pub head: Option<String>,
    pub base: Option<String>,
    pub body: Option<String>,
    pub draft: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MergeBody {
    /// A number or a numeric string.
    pub pull_number: Option<Value>,
    pub merge_method: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBranchBody {
    pub branch_name: Option<String>,
}

pub async fn ping(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "API is running",
        "time": chrono::Utc::now().to_rfc3339(),
        "tokenConfigured": state.token_configured,
    }))
}

/// Recursive listings go through the git trees API and may be narrowed to
/// a subdirectory. Non-recursive listings use the contents API.
pub async fn tree(
    State(state): State<AppState>,
    Query(query): Query<TreeQuery>,
) -> ServerResult<Json<Value>> {
    async {
        let coordinate = state.coordinate(query.owner.as_deref(), query.repo.as_deref());
        let reference = non_empty(&query.reference).unwrap_or(state.default_branch());
        let path = non_empty(&query.path).unwrap_or_default();

        if !reshape::flag(query.recursive.as_deref(), true) {
            let listing = state
                .upstream
                .get(&contents_path(&coordinate, path), &[("ref", reference)])
                .await?;
            return Ok(Json(listing));
        }

        let tree = state.tree_hash(reference, &coordinate).await?;
        let trees = ApiPath::repo(&coordinate)
            .nested("git/trees")
            .segment(tree.as_str());
        let mut listing = state.upstream.get(&trees, &[("recursive", "1")]).await?;
        reshape::filter_tree(&mut listing, path);
        if let Some(object) = listing.as_object_mut() {
            object.insert("ref".into(), reference.into());
        }
        Ok::<_, ServerError>(Json(listing))
    }
    .await
    .map_err(report("tree"))
}

pub async fn file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> ServerResult<Json<Value>> {
    async {
        let (data, text) = fetch_text(&state, &query).await?;
        Ok::<_, ServerError>(Json(json!({
            "name": data["name"],
            "path": data["path"],
            "sha": data["sha"],
            "size": data["size"],
            "line_count": reshape::count_lines(&text),
            "content": text,
            "encoding": data["encoding"],
            "url": data["url"],
            "html_url": data["html_url"],
            "git_url": data["git_url"],
            "download_url": data["download_url"],
            "ref": ref_label(&query),
        })))
    }
    .await
    .map_err(report("file"))
}

pub async fn file_line_count(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> ServerResult<Json<Value>> {
    async {
        let (_, text) = fetch_text(&state, &query).await?;
        Ok::<_, ServerError>(Json(json!({
            "line_count": reshape::count_lines(&text),
            "ref": ref_label(&query),
        })))
    }
    .await
    .map_err(report("file-linecount"))
}

/// Create `refs/heads/<branchName>` at `fromSha`, at whatever `fromRef`
/// resolves to, or at the default branch head.
pub async fn create_branch(
    State(state): State<AppState>,
    Query(query): Query<RepoQuery>,
    body: Bytes,
) -> ServerResult<Json<Value>> {
    async {
        let body: CreateBranchBody = parse_body(&body)?;
        let name = required(&body.branch_name, "branchName is required")?;
        validate_branch_name(name)?;
        let coordinate = state.coordinate(query.owner.as_deref(), query.repo.as_deref());

        let base = match (non_empty(&body.from_sha), non_empty(&body.from_ref)) {
            (Some(sha), _) => sha.to_string(),
            (None, Some(reference)) => state
                .resolver
                .resolve_commit(reference, &coordinate)
                .await?
                .to_string(),
            (None, None) => state
                .resolver
                .branch_head(state.default_branch(), &coordinate)
                .await?
                .to_string(),
        };
        tracing::info!(%coordinate, branch = name, %base, "creating branch");

        let created = state
            .upstream
            .post(
                &ApiPath::repo(&coordinate).nested("git/refs"),
                &json!({ "ref": format!("refs/heads/{name}"), "sha": base }),
            )
            .await?;
        state.invalidate_trees(&coordinate);
        Ok::<_, ServerError>(Json(created))
    }
    .await
    .map_err(report("branch"))
}

pub async fn branch_head(
    State(state): State<AppState>,
    Query(query): Query<BranchHeadQuery>,
) -> ServerResult<Json<Value>> {
    async {
        let branch = required(&query.branch, "branch is required")?;
        let coordinate = state.coordinate(query.owner.as_deref(), query.repo.as_deref());
        let head = state.resolver.branch_head(branch, &coordinate).await?;
        Ok::<_, ServerError>(Json(json!({ "branch": branch, "head_sha": head })))
    }
    .await
    .map_err(report("branch-head"))
}

/// Create or update one file. Without an explicit `sha`, the current blob
/// on `branch` is looked up so updates do not need the caller to know it.
pub async fn commit(
    State(state): State<AppState>,
    Query(query): Query<RepoQuery>,
    body: Bytes,
) -> ServerResult<Json<Value>> {
    async {
        let body: CommitBody = parse_body(&body)?;
        let fields = (
            non_empty(&body.path),
            non_empty(&body.message),
            non_empty(&body.content),
            non_empty(&body.branch),
        );
        let (Some(path), Some(message), Some(content), Some(branch)) = fields else {
            return Err(ServerError::bad_request(
                "path, message, content and branch are required",
            ));
        };
        let coordinate = state.coordinate(query.owner.as_deref(), query.repo.as_deref());
        let target = contents_path(&coordinate, path);

        let sha = match non_empty(&body.sha) {
            Some(sha) => Some(sha.to_string()),
            None => match state.upstream.get(&target, &[("ref", branch)]).await {
                Ok(existing) => existing.get("sha").and_then(Value::as_str).map(str::to_string),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e.into()),
            },
        };

        let mut payload = Map::new();
        payload.insert("message".into(), message.into());
        payload.insert("content".into(), content.into());
        payload.insert("branch".into(), branch.into());
        if let Some(sha) = sha {
            payload.insert("sha".into(), sha.into());
        }
        let committed = state.upstream.put(&target, &Value::Object(payload)).await?;
        state.invalidate_trees(&coordinate);
        Ok::<_, ServerError>(Json(committed))
    }
    .await
    .map_err(report("commit"))
}

pub async fn create_pull(
    State(state): State<AppState>,
    Query(query): Query<RepoQuery>,
    body: Bytes,
) -> ServerResult<Json<Value>> {
    async {
        let body: PullBody = parse_body(&body)?;
        let (Some(title), Some(head), Some(base)) = (
            non_empty(&body.title),
            non_empty(&body.head),
            non_empty(&body.base),
        ) else {
            return Err(ServerError::bad_request("title, head and base are required"));
        };
        let coordinate = state.coordinate(query.owner.as_deref(), query.repo.as_deref());

        let mut payload = json!({
            "title": title,
            "head": head,
            "base": base,
            "draft": body.draft.unwrap_or(false),
        });
        if let (Some(text), Some(object)) = (&body.body, payload.as_object_mut()) {
            object.insert("body".into(), text.as_str().into());
        }
        let pull = state
            .upstream
            .post(&ApiPath::repo(&coordinate).segment("pulls"), &payload)
            .await?;
        Ok::<_, ServerError>(Json(pull))
    }
    .await
    .map_err(report("pull"))
}

pub async fn merge(
    State(state): State<AppState>,
    Query(query): Query<RepoQuery>,
    body: Bytes,
) -> ServerResult<Json<Value>> {
    async {
        let body: MergeBody = parse_body(&body)?;
        let number = body
            .pull_number
            .as_ref()
            .and_then(pull_number)
            .ok_or_else(|| ServerError::bad_request("pull_number must be a positive integer"))?;
        let method = non_empty(&body.merge_method).unwrap_or("merge");
        if !MERGE_METHODS.contains(&method) {
            return Err(ServerError::bad_request(format!(
                "merge_method must be one of {}",
                MERGE_METHODS.join(", ")
            )));
        }
        let coordinate = state.coordinate(query.owner.as_deref(), query.repo.as_deref());

        let path = ApiPath::repo(&coordinate)
            .segment("pulls")
            .segment(number.to_string())
            .segment("merge");
        let merged = state
            .upstream
            .put(&path, &json!({ "merge_method": method }))
            .await?;
        state.invalidate_trees(&coordinate);
        Ok::<_, ServerError>(Json(merged))
    }
    .await
    .map_err(report("merge"))
}

pub async fn delete_branch(
    State(state): State<AppState>,
    Query(query): Query<RepoQuery>,
    body: Bytes,
) -> ServerResult<Json<Value>> {
    async {
        let body: DeleteBranchBody = parse_body(&body)?;
        let name = required(&body.branch_name, "branchName is required")?;
        let coordinate = state.coordinate(query.owner.as_deref(), query.repo.as_deref());

        state
            .upstream
            .delete(&ApiPath::repo(&coordinate).nested("git/refs/heads").nested(name))
            .await?;
        state.invalidate_trees(&coordinate);
        tracing::info!(%coordinate, branch = name, "branch deleted");
        Ok::<_, ServerError>(Json(
            json!({ "message": format!("Branch '{name}' deleted successfully.") }),
        ))
    }
    .await
    .map_err(report("delete-branch"))
}

pub async fn branches(
    State(state): State<AppState>,
    Query(query): Query<RepoQuery>,
) -> ServerResult<Json<Value>> {
    async {
        let coordinate = state.coordinate(query.owner.as_deref(), query.repo.as_deref());
        let listing = state
            .upstream
            .get(&ApiPath::repo(&coordinate).segment("branches"), &[("per_page", "100")])
            .await?;
        let names: Vec<&str> = listing
            .as_array()
            .map(|list| list.iter().filter_map(|b| b.get("name")?.as_str()).collect())
            .unwrap_or_default();
        Ok::<_, ServerError>(Json(json!({ "branches": names })))
    }
    .await
    .map_err(report("branches"))
}

/// Push notifications. The signature covers the raw body, so the body is
/// taken as bytes and only parsed after it verifies.
pub async fn github_webhook(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Json<Value>> {
    async {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        if !state.verifier.verify(&body, signature) {
            tracing::warn!("webhook signature mismatch");
            return Err(ServerError::InvalidSignature);
        }

        let event = headers.get(EVENT_HEADER).and_then(|v| v.to_str().ok());
        if event == Some("ping") {
            return Ok(Json(json!({ "ok": true, "event": "ping" })));
        }

        let payload: Value = parse_body(&body)?;
        let branch = pushed_branch(query.reference.as_deref(), &payload, state.default_branch());
        let coordinate = pushed_repository(&payload).unwrap_or_else(|| state.defaults.clone());

        state.invalidate_trees(&coordinate);
        let head = state.resolver.branch_head(&branch, &coordinate).await?;
        tracing::info!(%coordinate, %branch, %head, "push received");
        Ok::<_, ServerError>(Json(json!({ "ok": true, "branch": branch, "head": head })))
    }
    .await
    .map_err(report("webhook"))
}

async fn fetch_text(state: &AppState, query: &FileQuery) -> ServerResult<(Value, String)> {
    let path = required(&query.path, "path query parameter is required")?;
    let coordinate = state.coordinate(query.owner.as_deref(), query.repo.as_deref());
    let params: Vec<(&str, &str)> = non_empty(&query.reference)
        .map(|r| vec![("ref", r)])
        .unwrap_or_default();

    let data = state
        .upstream
        .get(&contents_path(&coordinate, path), &params)
        .await?;
    let Some(encoded) = data.get("content").and_then(Value::as_str) else {
        return Err(ServerError::bad_request(
            "file has no content or is not a file",
        ));
    };
    let text = reshape::decode_content(encoded)?;
    Ok((data, text))
}

/// `contents/{path}`, keeping the slashes of `path`.
fn contents_path(coordinate: &RepositoryCoordinate, path: &str) -> ApiPath {
    ApiPath::repo(coordinate).segment("contents").nested(path)
}

fn ref_label(query: &FileQuery) -> &str {
    non_empty(&query.reference).unwrap_or("default-branch")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a Option<String>, message: &str) -> ServerResult<&'a str> {
    non_empty(value).ok_or_else(|| ServerError::bad_request(message))
}

/// Request bodies are JSON whatever their content type. An empty body reads
/// as all fields absent.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> ServerResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ServerError::bad_request(format!("invalid JSON body: {e}")))
}

fn pull_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n| *n > 0)
}

fn report(endpoint: &'static str) -> impl FnOnce(ServerError) -> ServerError {
    move |error| {
        if let Some(upstream) = error.upstream() {
            tracing::warn!(endpoint, error = %upstream, "upstream request failed");
        }
        error
    }
}
