use crate::db;
use crate::errors::ApiError;
use crate::models::*;
use crate::state::AppState;
use ark_bn254::Fr;
use axum::{
    extract::{Path, Query, Request, State},
    http::HeaderMap,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use base64::Engine;
use cred_registry::{CredId, CredParams, Identity};
use cred_zk::groth16::{proof_from_b64, serialize_vk};
use cred_zk::types::FrHex;
use tower_http::cors::{Any, CorsLayer};

pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/v1/groups", post(create_cred))
        .route("/api/v1/groups/:id/admin", put(set_admin))
        .route("/api/v1/groups/:id/duration", put(set_duration))
        .route("/api/v1/groups/:id/members", post(add_member).put(update_member))
        .route("/api/v1/groups/:id/members/batch", post(add_members))
        .route("/api/v1/groups/:id/members/remove", post(remove_member))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/groups/:id", get(get_cred))
        .route("/api/v1/groups/:id/members/:index/proof", get(get_merkle_proof))
        .route("/api/v1/groups/:id/proofs", post(verify_proof))
        .route("/api/v1/groups/:id/events", get(list_events))
        .route("/api/v1/zk/vk/:depth", get(get_vk))
        .merge(protected_routes)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(provided_key) = headers.get("X-API-KEY") {
        if provided_key == state.api_key.as_ref() {
            return Ok(next.run(request).await);
        }
    }

    tracing::warn!("unauthorized access attempt");
    Err(ApiError::Unauthorized)
}

/// Identity the caller acts as on admin-gated routes.
fn caller(headers: &HeaderMap) -> Result<Identity, ApiError> {
    headers
        .get("X-CALLER")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(Identity::new)
        .ok_or_else(|| ApiError::BadRequest("missing X-CALLER header".to_string()))
}

fn parse_fr(v: &FrHex, what: &str) -> Result<Fr, ApiError> {
    v.to_fr().map_err(|e| ApiError::BadRequest(format!("invalid {what}: {e}")))
}

fn parse_frs(vs: &[FrHex], what: &str) -> Result<Vec<Fr>, ApiError> {
    vs.iter().map(|v| parse_fr(v, what)).collect()
}

async fn create_cred(State(state): State<AppState>, Json(req): Json<CreateCredRequest>) -> Result<Json<CredResponse>, ApiError> {
    let zero_value = parse_fr(&req.zero_value, "zero_value")?;
    let params = CredParams {
        depth: req.depth,
        zero_value,
        admin: req.admin,
        uri: req.uri,
        root_validity_duration: req.root_validity_duration,
    };

    let id = req.id;
    let cred = state
        .mutate(|r| {
            r.create_cred(id, params)?;
            cred_response(r, id)
        })
        .await?;

    Ok(Json(cred))
}

fn cred_response(r: &crate::state::Registry, id: CredId) -> Result<CredResponse, cred_registry::CredError> {
    Ok(CredResponse {
        id,
        depth: r.get_depth(id)?,
        zero_value: r.get_zero_value(id)?.into(),
        root: r.get_root(id)?.into(),
        leaf_count: r.get_leaf_count(id)?,
        admin: r.get_admin(id)?.clone(),
        uri: r.get_uri(id)?.to_string(),
        root_validity_duration: r.get_root_validity_duration(id)?,
    })
}

async fn get_cred(State(state): State<AppState>, Path(id): Path<CredId>) -> Result<Json<CredResponse>, ApiError> {
    Ok(Json(state.read_registry(|r| cred_response(r, id)).await?))
}

async fn set_admin(
    State(state): State<AppState>,
    Path(id): Path<CredId>,
    headers: HeaderMap,
    Json(req): Json<SetAdminRequest>,
) -> Result<Json<CredResponse>, ApiError> {
    let caller = caller(&headers)?;
    let cred = state
        .mutate(|r| {
            r.set_admin(id, &caller, req.new_admin)?;
            cred_response(r, id)
        })
        .await?;
    Ok(Json(cred))
}

async fn set_duration(
    State(state): State<AppState>,
    Path(id): Path<CredId>,
    headers: HeaderMap,
    Json(req): Json<SetDurationRequest>,
) -> Result<Json<CredResponse>, ApiError> {
    let caller = caller(&headers)?;
    let cred = state
        .mutate(|r| {
            r.set_root_validity_duration(id, &caller, req.root_validity_duration)?;
            cred_response(r, id)
        })
        .await?;
    Ok(Json(cred))
}

async fn add_member(
    State(state): State<AppState>,
    Path(id): Path<CredId>,
    headers: HeaderMap,
    Json(req): Json<AddMemberRequest>,
) -> Result<Json<MemberResponse>, ApiError> {
    let caller = caller(&headers)?;
    let leaf = parse_fr(&req.leaf, "leaf")?;

    let (index, root) = state
        .mutate(|r| {
            let index = r.add_member(id, &caller, leaf)?;
            Ok((index, r.get_root(id)?))
        })
        .await?;

    Ok(Json(MemberResponse { index, root: root.into() }))
}

async fn add_members(
    State(state): State<AppState>,
    Path(id): Path<CredId>,
    headers: HeaderMap,
    Json(req): Json<AddMembersRequest>,
) -> Result<Json<MemberResponse>, ApiError> {
    let caller = caller(&headers)?;
    let leaves = parse_frs(&req.leaves, "leaf")?;

    let (index, root) = state
        .mutate(|r| {
            let index = r.add_members(id, &caller, &leaves)?;
            Ok((index, r.get_root(id)?))
        })
        .await?;

    Ok(Json(MemberResponse { index, root: root.into() }))
}

async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<CredId>,
    headers: HeaderMap,
    Json(req): Json<UpdateMemberRequest>,
) -> Result<Json<MemberResponse>, ApiError> {
    let caller = caller(&headers)?;
    let old_leaf = parse_fr(&req.old_leaf, "old_leaf")?;
    let new_leaf = parse_fr(&req.new_leaf, "new_leaf")?;
    let siblings = parse_frs(&req.siblings, "sibling")?;

    let (index, root) = state
        .mutate(|r| {
            let index = r.update_member(id, &caller, old_leaf, new_leaf, &siblings, &req.path_indices)?;
            Ok((index, r.get_root(id)?))
        })
        .await?;

    Ok(Json(MemberResponse { index, root: root.into() }))
}

async fn remove_member(
    State(state): State<AppState>,
    Path(id): Path<CredId>,
    headers: HeaderMap,
    Json(req): Json<RemoveMemberRequest>,
) -> Result<Json<MemberResponse>, ApiError> {
    let caller = caller(&headers)?;
    let leaf = parse_fr(&req.leaf, "leaf")?;
    let siblings = parse_frs(&req.siblings, "sibling")?;

    let (index, root) = state
        .mutate(|r| {
            let index = r.remove_member(id, &caller, leaf, &siblings, &req.path_indices)?;
            Ok((index, r.get_root(id)?))
        })
        .await?;

    Ok(Json(MemberResponse { index, root: root.into() }))
}

async fn get_merkle_proof(
    State(state): State<AppState>,
    Path((id, index)): Path<(CredId, u64)>,
) -> Result<Json<MerkleProofResponse>, ApiError> {
    let proof = state.read_registry(|r| r.merkle_proof(id, index)).await?;

    Ok(Json(MerkleProofResponse {
        index,
        leaf: proof.leaf.into(),
        siblings: proof.siblings.iter().copied().map(FrHex::from).collect(),
        path_indices: proof.path_indices,
        root: proof.root.into(),
    }))
}

async fn verify_proof(
    State(state): State<AppState>,
    Path(id): Path<CredId>,
    Json(req): Json<VerifyProofRequest>,
) -> Result<Json<VerifyProofResponse>, ApiError> {
    let root = parse_fr(&req.root, "root")?;
    let signal = parse_fr(&req.signal, "signal")?;
    let nullifier_hash = parse_fr(&req.nullifier_hash, "nullifier_hash")?;
    let external_nullifier = parse_fr(&req.external_nullifier, "external_nullifier")?;
    let proof = proof_from_b64(&req.proof_b64).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    // Pairing checks run on a blocking thread while the registry lock is held, so the nullifier
    // check and its consumption cannot interleave with another call.
    state
        .mutate_blocking(move |r| r.verify_proof(id, root, signal, nullifier_hash, external_nullifier, &proof))
        .await?;

    Ok(Json(VerifyProofResponse { ok: true }))
}

async fn list_events(
    State(state): State<AppState>,
    Path(id): Path<CredId>,
    Query(params): Query<ListEventsParams>,
) -> Result<Json<EventListResponse>, ApiError> {
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(50).min(500);

    // Unknown creds are a 404, not an empty list.
    state.read_registry(|r| r.get_depth(id)).await?;

    let rows = db::list_events(&state.db, id, offset, limit).await?;
    let events = rows
        .into_iter()
        .map(|row| EventItem {
            seq: row.seq,
            event_id: row.event_id,
            created_at: row.created_at,
            event: row.event,
        })
        .collect();

    Ok(Json(EventListResponse {
        id,
        offset,
        limit,
        events,
    }))
}

async fn get_vk(State(state): State<AppState>, Path(depth): Path<usize>) -> Result<Json<ZkVkResponse>, ApiError> {
    let keys = state
        .keys(depth)
        .ok_or_else(|| ApiError::NotFound(format!("no verifying key for depth {depth}")))?;
    let vk_bytes = serialize_vk(keys.vk.as_ref()).map_err(|_| ApiError::Internal)?;

    let b64 = base64::engine::general_purpose::STANDARD.encode(vk_bytes);

    Ok(Json(ZkVkResponse {
        curve: "bn254".to_string(),
        proof_system: "groth16".to_string(),
        depth: keys.depth,
        vk_b64: b64,
    }))
}
