//! Role, key and invite management. Views are admin-or-above; everything
//! that mutates state (and the key listing, which exposes bearer secrets) is
//! superadmin-only. Role checks run against the `AuthContext` the session
//! middleware rebuilt for this request, so they are never stale.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{
    ActivityDto, AdminKeyDto, ApiError, ApiResponse, AppState, InviteDto, MessageResponse,
    UserDto, record_activity,
};
use crate::db::Role;
use crate::services::AuthContext;

/// Activity view page size; also the store's retention cap.
const ACTIVITY_VIEW_LIMIT: u64 = 200;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

#[derive(Deserialize)]
pub struct CreateKeyRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct RevokeKeyRequest {
    pub key: String,
}

#[derive(Deserialize)]
pub struct CreateInviteRequest {
    pub email: String,
}

// ============================================================================
// Users & roles
// ============================================================================

/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    ctx.require_admin()?;

    let users = state.store().list_users().await?;

    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserDto::from).collect(),
    )))
}

/// PUT /admin/users/{username}/role
/// Promotion and demotion are one atomic update of the single role column;
/// demoting a superadmin drops both privilege levels at once.
pub async fn set_user_role(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(username): Path<String>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    ctx.require_superadmin()?;

    let role = Role::parse(payload.role.trim()).ok_or_else(|| {
        ApiError::validation("Role must be one of: regular, admin, superadmin")
    })?;

    let target = username.trim().to_lowercase();
    if !state.store().set_user_role(&target, role).await? {
        return Err(ApiError::not_found("User", &target));
    }

    record_activity(
        &state,
        &ctx.username,
        "updated role",
        Some(format!("{target} -> {role}")),
    )
    .await;

    tracing::info!(target = %target, role = %role, by = %ctx.username, "Role updated");

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("{target} is now {role}"),
    })))
}

// ============================================================================
// Admin keys
// ============================================================================

/// GET /admin/keys
/// Superadmin-only: the listing exposes the bearer secrets themselves.
pub async fn list_keys(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<ApiResponse<Vec<AdminKeyDto>>>, ApiError> {
    ctx.require_superadmin()?;

    let keys = state.store().list_keys().await?;

    Ok(Json(ApiResponse::success(
        keys.into_iter().map(AdminKeyDto::from).collect(),
    )))
}

/// POST /admin/keys
pub async fn create_key(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<CreateKeyRequest>,
) -> Result<Json<ApiResponse<AdminKeyDto>>, ApiError> {
    ctx.require_superadmin()?;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::validation("A target username is required"));
    }

    let key = state.store().add_key(&name, &ctx.username).await?;

    record_activity(
        &state,
        &ctx.username,
        "generated admin key",
        Some(format!("for {}", key.name)),
    )
    .await;

    tracing::info!(name = %key.name, by = %ctx.username, "Admin key generated");

    Ok(Json(ApiResponse::success(AdminKeyDto::from(key))))
}

/// DELETE /admin/keys
/// Revocation invalidates future logins with the key; sessions it already
/// established stay alive.
pub async fn revoke_key(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<RevokeKeyRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    ctx.require_superadmin()?;

    if !state.store().revoke_key(payload.key.trim()).await? {
        return Err(ApiError::NotFound("Admin key not found".to_string()));
    }

    record_activity(&state, &ctx.username, "revoked admin key", None).await;

    tracing::info!(by = %ctx.username, "Admin key revoked");

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Admin key revoked".to_string(),
    })))
}

// ============================================================================
// Invites
// ============================================================================

/// GET /admin/invites
pub async fn list_invites(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<ApiResponse<Vec<InviteDto>>>, ApiError> {
    ctx.require_admin()?;

    let invites = state.store().list_invites().await?;

    Ok(Json(ApiResponse::success(
        invites.into_iter().map(InviteDto::from).collect(),
    )))
}

/// POST /admin/invites
pub async fn create_invite(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<CreateInviteRequest>,
) -> Result<Json<ApiResponse<InviteDto>>, ApiError> {
    ctx.require_superadmin()?;

    let email = payload.email.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation("A valid email address is required"));
    }

    let Some(invite) = state.store().create_invite(&email, &ctx.username).await? else {
        return Err(ApiError::Conflict(format!(
            "An invite for {email} is already pending"
        )));
    };

    record_activity(
        &state,
        &ctx.username,
        "created invite",
        Some(format!("email: {email}")),
    )
    .await;

    tracing::info!(email = %email, by = %ctx.username, "Invite created");

    Ok(Json(ApiResponse::success(InviteDto::from(invite))))
}

/// DELETE /admin/invites/{email}
/// Only a pending invite can be revoked; used invites are immutable.
pub async fn revoke_invite(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(email): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    ctx.require_superadmin()?;

    let email = email.trim().to_string();
    if !state.store().revoke_invite(&email).await? {
        return Err(ApiError::NotFound(format!(
            "No pending invite for {email}"
        )));
    }

    record_activity(
        &state,
        &ctx.username,
        "revoked invite",
        Some(format!("email: {email}")),
    )
    .await;

    tracing::info!(email = %email, by = %ctx.username, "Invite revoked");

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Invite for {email} revoked"),
    })))
}

// ============================================================================
// Activity log
// ============================================================================

/// GET /admin/activity
pub async fn recent_activity(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<ApiResponse<Vec<ActivityDto>>>, ApiError> {
    ctx.require_admin()?;

    let entries = state.store().recent_activity(ACTIVITY_VIEW_LIMIT).await?;

    Ok(Json(ApiResponse::success(
        entries.into_iter().map(ActivityDto::from).collect(),
    )))
}
