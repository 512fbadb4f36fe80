use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use keeper_application::{
    CreateRoleInput, RoleAdminGateway, RoleMembershipGateway, UpdateRoleInput,
};
use keeper_core::{AppError, TenantId};
use keeper_domain::{PermissionAction, PermissionId, RoleId, UserId};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use url::Url;
use uuid::Uuid;

use super::{HttpRoleAdminGateway, HttpRoleAdminGatewayConfig, TENANT_HEADER};

#[derive(Clone, Default)]
struct StubState {
    membership_statuses: Arc<Mutex<HashMap<String, StatusCode>>>,
    seen_headers: Arc<Mutex<Vec<(Option<String>, Option<String>)>>>,
    calls: Arc<Mutex<Vec<String>>>,
    known_roles: Arc<Mutex<HashSet<String>>>,
    role_writes: Arc<Mutex<Vec<(String, String, Value)>>>,
}

fn user(value: u128) -> UserId {
    UserId::from_uuid(Uuid::from_u128(value))
}

async fn list_roles(State(state): State<StubState>, headers: HeaderMap) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    state
        .seen_headers
        .lock()
        .await
        .push((header("authorization"), header(TENANT_HEADER)));

    Json(json!({
        "items": [{
            "id": Uuid::from_u128(100),
            "name": "admin",
            "is_system": true,
            "permissions": [{
                "id": Uuid::from_u128(200),
                "resource_type": "artifacts",
                "action": "admin",
                "description": "Administer artifacts"
            }],
            "user_count": 2,
            "created_at": "2026-01-01T00:00:00Z"
        }]
    }))
}

async fn get_role(
    State(state): State<StubState>,
    Path(role_id): Path<String>,
) -> impl IntoResponse {
    if state.known_roles.lock().await.contains(&role_id) {
        return (
            StatusCode::OK,
            Json(json!({ "id": role_id, "name": "deployers" })),
        );
    }

    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "role not found" })),
    )
}

async fn update_role(
    State(state): State<StubState>,
    Path(role_id): Path<String>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    state
        .role_writes
        .lock()
        .await
        .push(("PUT".to_owned(), role_id.clone(), payload.clone()));

    Json(json!({
        "role_id": role_id,
        "name": "deployers",
        "display_name": payload["display_name"],
        "description": payload["description"],
        "permissions": [{
            "permission_id": Uuid::from_u128(200),
            "resource": "artifacts",
            "action": "write"
        }],
    }))
}

async fn delete_role(State(state): State<StubState>, Path(role_id): Path<String>) -> StatusCode {
    state
        .role_writes
        .lock()
        .await
        .push(("DELETE".to_owned(), role_id, Value::Null));
    StatusCode::NO_CONTENT
}

async fn create_role(Json(payload): Json<Value>) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(json!({
            "role_id": Uuid::from_u128(300),
            "name": payload["name"],
            "description": payload["description"],
            "permissions": [],
        })),
    )
}

async fn list_members(Path(_role_id): Path<String>) -> Json<Value> {
    Json(json!([
        { "user_id": Uuid::from_u128(1), "username": "ada" },
        { "id": Uuid::from_u128(2), "username": "grace", "display_name": "Grace Hopper" }
    ]))
}

async fn membership_status(state: &StubState, method: &str, user_id: String) -> StatusCode {
    state.calls.lock().await.push(format!("{method} {user_id}"));
    state
        .membership_statuses
        .lock()
        .await
        .get(&user_id)
        .copied()
        .unwrap_or(StatusCode::NO_CONTENT)
}

async fn assign_member(
    State(state): State<StubState>,
    Path((_role_id, user_id)): Path<(String, String)>,
) -> StatusCode {
    membership_status(&state, "POST", user_id).await
}

async fn unassign_member(
    State(state): State<StubState>,
    Path((_role_id, user_id)): Path<(String, String)>,
) -> StatusCode {
    membership_status(&state, "DELETE", user_id).await
}

async fn list_users() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(500)).await;
    Json(json!([]))
}

async fn list_permissions() -> impl IntoResponse {
    (StatusCode::FORBIDDEN, "missing admin grant")
}

async fn spawn_stub(state: StubState) -> Url {
    let router = Router::new()
        .route("/api/v1/roles", get(list_roles).post(create_role))
        .route(
            "/api/v1/roles/{role_id}",
            get(get_role).put(update_role).delete(delete_role),
        )
        .route("/api/v1/roles/{role_id}/users", get(list_members))
        .route(
            "/api/v1/roles/{role_id}/users/{user_id}",
            post(assign_member).delete(unassign_member),
        )
        .route("/api/v1/users", get(list_users))
        .route("/api/v1/permissions", get(list_permissions))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap_or_else(|_| unreachable!());
    let address = listener.local_addr().unwrap_or_else(|_| unreachable!());
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Url::parse(format!("http://{address}/").as_str()).unwrap_or_else(|_| unreachable!())
}

fn gateway(base_url: Url, tenant_id: Option<TenantId>) -> HttpRoleAdminGateway {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap_or_else(|_| unreachable!());

    HttpRoleAdminGateway::new(
        http_client,
        HttpRoleAdminGatewayConfig {
            base_url,
            api_token: Some("secret-token".to_owned()),
            tenant_id,
        },
    )
}

#[tokio::test]
async fn list_roles_parses_envelope_and_sends_auth_headers() {
    let state = StubState::default();
    let tenant_id = TenantId::new();
    let gateway = gateway(spawn_stub(state.clone()).await, Some(tenant_id));

    let roles = gateway.list_roles().await.unwrap_or_default();

    assert_eq!(roles.len(), 1);
    let role = &roles[0];
    assert_eq!(role.role_id(), RoleId::from_uuid(Uuid::from_u128(100)));
    assert!(role.is_system());
    assert_eq!(role.user_count(), 2);
    assert_eq!(role.permissions()[0].action, PermissionAction::Admin);
    assert_eq!(
        role.permissions()[0].permission_id,
        PermissionId::from_uuid(Uuid::from_u128(200))
    );
    assert!(role.created_at().is_some());

    let seen = state.seen_headers.lock().await.clone();
    assert_eq!(
        seen,
        vec![(
            Some("Bearer secret-token".to_owned()),
            Some(tenant_id.to_string())
        )]
    );
}

#[test]
fn base_url_path_prefix_is_preserved() {
    for base in ["http://127.0.0.1:9/keeper", "http://127.0.0.1:9/keeper/"] {
        let base_url = Url::parse(base).unwrap_or_else(|_| unreachable!());
        let endpoint = gateway(base_url, None).endpoint(&["roles", "abc"]);

        assert_eq!(
            endpoint.map(|url| url.path().to_owned()),
            Ok("/keeper/api/v1/roles/abc".to_owned())
        );
    }
}

#[tokio::test]
async fn list_role_members_accepts_bare_arrays_and_id_alias() {
    let gateway = gateway(spawn_stub(StubState::default()).await, None);

    let members = gateway
        .list_role_members(RoleId::new())
        .await
        .unwrap_or_default();

    assert_eq!(members.len(), 2);
    assert_eq!(members[1].user_id, user(2));
    assert_eq!(members[1].label(), "Grace Hopper");
}

#[tokio::test]
async fn missing_role_maps_to_not_found_with_message() {
    let gateway = gateway(spawn_stub(StubState::default()).await, None);

    let result = gateway.get_role(RoleId::new()).await;

    assert!(matches!(
        result,
        Err(AppError::NotFound(ref message)) if message.contains("role not found")
    ));
}

#[tokio::test]
async fn forbidden_status_maps_to_forbidden() {
    let gateway = gateway(spawn_stub(StubState::default()).await, None);

    let result = gateway.list_permissions().await;

    assert!(matches!(
        result,
        Err(AppError::Forbidden(ref message)) if message.contains("missing admin grant")
    ));
}

#[tokio::test]
async fn slow_backend_maps_to_timeout() {
    let gateway = gateway(spawn_stub(StubState::default()).await, None);

    let result = gateway.list_users().await;

    assert!(matches!(result, Err(AppError::Timeout(_))));
}

#[tokio::test]
async fn create_role_posts_payload_and_parses_role() {
    let gateway = gateway(spawn_stub(StubState::default()).await, None);

    let role = gateway
        .create_role(CreateRoleInput {
            name: "deployers".to_owned(),
            display_name: None,
            description: Some("Push artifacts".to_owned()),
            permission_ids: Vec::new(),
        })
        .await;

    let role = role.unwrap_or_else(|_| unreachable!());
    assert_eq!(role.name().as_str(), "deployers");
    assert_eq!(role.description(), Some("Push artifacts"));
    assert!(!role.is_system());
}

#[tokio::test]
async fn repeated_assign_and_unassign_are_no_ops() {
    let state = StubState::default();
    state
        .membership_statuses
        .lock()
        .await
        .insert(user(1).to_string(), StatusCode::CONFLICT);
    state
        .membership_statuses
        .lock()
        .await
        .insert(user(2).to_string(), StatusCode::NOT_FOUND);
    let gateway = gateway(spawn_stub(state.clone()).await, None);
    let role_id = RoleId::new();
    state.known_roles.lock().await.insert(role_id.to_string());

    assert!(gateway.assign_user_to_role(role_id, user(1)).await.is_ok());
    assert!(gateway.unassign_user_from_role(role_id, user(2)).await.is_ok());
    assert!(gateway.assign_user_to_role(role_id, user(3)).await.is_ok());

    assert_eq!(
        state.calls.lock().await.clone(),
        vec![
            format!("POST {}", user(1)),
            format!("DELETE {}", user(2)),
            format!("POST {}", user(3)),
        ]
    );
}

#[tokio::test]
async fn membership_server_errors_are_reported() {
    let state = StubState::default();
    state
        .membership_statuses
        .lock()
        .await
        .insert(user(4).to_string(), StatusCode::INTERNAL_SERVER_ERROR);
    state
        .membership_statuses
        .lock()
        .await
        .insert(user(5).to_string(), StatusCode::UNPROCESSABLE_ENTITY);
    let gateway = gateway(spawn_stub(state).await, None);
    let role_id = RoleId::new();

    let assign = gateway.assign_user_to_role(role_id, user(4)).await;
    let unassign = gateway.unassign_user_from_role(role_id, user(5)).await;

    assert!(matches!(assign, Err(AppError::Internal(_))));
    assert!(matches!(unassign, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn unassign_on_deleted_role_is_not_found() {
    let state = StubState::default();
    state
        .membership_statuses
        .lock()
        .await
        .insert(user(2).to_string(), StatusCode::NOT_FOUND);
    let gateway = gateway(spawn_stub(state.clone()).await, None);

    let result = gateway.unassign_user_from_role(RoleId::new(), user(2)).await;

    assert!(matches!(
        result,
        Err(AppError::NotFound(ref message)) if message.contains("role not found")
    ));
}

#[tokio::test]
async fn remaining_status_codes_map_to_error_kinds() {
    let state = StubState::default();
    {
        let mut statuses = state.membership_statuses.lock().await;
        statuses.insert(user(6).to_string(), StatusCode::BAD_REQUEST);
        statuses.insert(user(7).to_string(), StatusCode::UNAUTHORIZED);
        statuses.insert(user(8).to_string(), StatusCode::REQUEST_TIMEOUT);
        statuses.insert(user(9).to_string(), StatusCode::GATEWAY_TIMEOUT);
    }
    let gateway = gateway(spawn_stub(state).await, None);
    let role_id = RoleId::new();

    let bad_request = gateway.assign_user_to_role(role_id, user(6)).await;
    let unauthorized = gateway.assign_user_to_role(role_id, user(7)).await;
    let request_timeout = gateway.assign_user_to_role(role_id, user(8)).await;
    let gateway_timeout = gateway.unassign_user_from_role(role_id, user(9)).await;

    assert!(matches!(bad_request, Err(AppError::Validation(_))));
    assert!(matches!(unauthorized, Err(AppError::Unauthorized(_))));
    assert!(matches!(
        request_timeout,
        Err(AppError::Timeout(ref message)) if message.contains("408")
    ));
    assert!(matches!(
        gateway_timeout,
        Err(AppError::Timeout(ref message)) if message.contains("504")
    ));
}

#[tokio::test]
async fn update_role_puts_payload_and_parses_role() {
    let state = StubState::default();
    let gateway = gateway(spawn_stub(state.clone()).await, None);
    let role_id = RoleId::new();
    let permission_id = PermissionId::from_uuid(Uuid::from_u128(200));

    let role = gateway
        .update_role(
            role_id,
            UpdateRoleInput {
                display_name: Some("Deployers".to_owned()),
                description: None,
                permission_ids: vec![permission_id],
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(role.role_id(), role_id);
    assert_eq!(role.display_name().as_str(), "Deployers");
    assert_eq!(role.permissions()[0].permission_id, permission_id);
    assert_eq!(
        state.role_writes.lock().await.clone(),
        vec![(
            "PUT".to_owned(),
            role_id.to_string(),
            json!({
                "display_name": "Deployers",
                "description": null,
                "permission_ids": [permission_id],
            })
        )]
    );
}

#[tokio::test]
async fn delete_role_sends_delete() {
    let state = StubState::default();
    let gateway = gateway(spawn_stub(state.clone()).await, None);
    let role_id = RoleId::new();

    assert!(gateway.delete_role(role_id).await.is_ok());
    assert_eq!(
        state.role_writes.lock().await.clone(),
        vec![("DELETE".to_owned(), role_id.to_string(), Value::Null)]
    );
}
