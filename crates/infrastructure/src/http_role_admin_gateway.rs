use async_trait::async_trait;
use keeper_application::{
    CreateRoleInput, RoleAdminGateway, RoleMembershipGateway, UpdateRoleInput,
};
use keeper_core::{AppError, AppResult, TenantId};
use keeper_domain::{Permission, Role, RoleId, UserId, UserSummary};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

mod dto;

#[cfg(test)]
mod tests;

use dto::{
    CreateRoleRequest, ErrorResponse, ListResponse, PermissionResponse, RoleResponse,
    UpdateRoleRequest, UserResponse,
};

/// Header carrying the tenant scope of every request.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Connection settings for the role administration REST API.
#[derive(Debug, Clone)]
pub struct HttpRoleAdminGatewayConfig {
    /// Backend base URL; `/api/v1` is appended.
    pub base_url: Url,
    /// Optional bearer token.
    pub api_token: Option<String>,
    /// Optional tenant scope.
    pub tenant_id: Option<TenantId>,
}

/// `reqwest` implementation of the role administration ports.
#[derive(Debug, Clone)]
pub struct HttpRoleAdminGateway {
    http_client: reqwest::Client,
    config: HttpRoleAdminGatewayConfig,
}

impl HttpRoleAdminGateway {
    /// Creates a gateway. Timeouts are taken from the supplied client.
    #[must_use]
    pub fn new(http_client: reqwest::Client, config: HttpRoleAdminGatewayConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Validation(format!(
                    "base url '{}' cannot carry a path",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);

        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self.http_client.request(method, url);
        if let Some(api_token) = &self.config.api_token {
            builder = builder.bearer_auth(api_token);
        }
        if let Some(tenant_id) = self.config.tenant_id {
            builder = builder.header(TENANT_HEADER, tenant_id.to_string());
        }

        builder
    }

    async fn send(&self, builder: RequestBuilder, context: &str) -> AppResult<Response> {
        let response = builder.send().await.map_err(|error| {
            if error.is_timeout() {
                AppError::Timeout(format!("{context} timed out: {error}"))
            } else {
                AppError::Internal(format!("failed to call backend for {context}: {error}"))
            }
        })?;

        let status = response.status();
        debug!(context, status = status.as_u16(), "role admin backend responded");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(body.as_str())
            .unwrap_or_default()
            .into_message()
            .unwrap_or(body);

        Err(error_from_status(status, context, message.as_str()))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        context: &str,
    ) -> AppResult<T> {
        self.send(builder, context)
            .await?
            .json::<T>()
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to parse backend response for {context}: {error}"
                ))
            })
    }

    async fn get_list<T: DeserializeOwned>(&self, url: Url, context: &str) -> AppResult<Vec<T>> {
        self.send_json::<ListResponse<T>>(self.request(Method::GET, url), context)
            .await
            .map(ListResponse::into_items)
    }
}

/// Maps a non-success backend status to the application error taxonomy.
fn error_from_status(status: StatusCode, context: &str, message: &str) -> AppError {
    let detail = if message.trim().is_empty() {
        format!("{context} returned status {}", status.as_u16())
    } else {
        format!(
            "{context} returned status {}: {}",
            status.as_u16(),
            message.trim()
        )
    };

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AppError::Validation(detail),
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(detail),
        StatusCode::FORBIDDEN => AppError::Forbidden(detail),
        StatusCode::NOT_FOUND => AppError::NotFound(detail),
        StatusCode::CONFLICT => AppError::Conflict(detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => AppError::Timeout(detail),
        _ => AppError::Internal(detail),
    }
}

#[async_trait]
impl RoleAdminGateway for HttpRoleAdminGateway {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.get_list::<RoleResponse>(self.endpoint(&["roles"])?, "list roles")
            .await?
            .into_iter()
            .map(RoleResponse::into_role)
            .collect()
    }

    async fn get_role(&self, role_id: RoleId) -> AppResult<Role> {
        let url = self.endpoint(&["roles", role_id.to_string().as_str()])?;
        self.send_json::<RoleResponse>(self.request(Method::GET, url), "get role")
            .await?
            .into_role()
    }

    async fn create_role(&self, input: CreateRoleInput) -> AppResult<Role> {
        let url = self.endpoint(&["roles"])?;
        let builder = self.request(Method::POST, url).json(&CreateRoleRequest {
            name: input.name.as_str(),
            display_name: input.display_name.as_deref(),
            description: input.description.as_deref(),
            permission_ids: input.permission_ids.as_slice(),
        });

        self.send_json::<RoleResponse>(builder, "create role")
            .await?
            .into_role()
    }

    async fn update_role(&self, role_id: RoleId, input: UpdateRoleInput) -> AppResult<Role> {
        let url = self.endpoint(&["roles", role_id.to_string().as_str()])?;
        let builder = self.request(Method::PUT, url).json(&UpdateRoleRequest {
            display_name: input.display_name.as_deref(),
            description: input.description.as_deref(),
            permission_ids: input.permission_ids.as_slice(),
        });

        self.send_json::<RoleResponse>(builder, "update role")
            .await?
            .into_role()
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let url = self.endpoint(&["roles", role_id.to_string().as_str()])?;
        self.send(self.request(Method::DELETE, url), "delete role")
            .await
            .map(|_| ())
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(self
            .get_list::<PermissionResponse>(self.endpoint(&["permissions"])?, "list permissions")
            .await?
            .into_iter()
            .map(Permission::from)
            .collect())
    }

    async fn list_users(&self) -> AppResult<Vec<UserSummary>> {
        Ok(self
            .get_list::<UserResponse>(self.endpoint(&["users"])?, "list users")
            .await?
            .into_iter()
            .map(UserSummary::from)
            .collect())
    }
}

#[async_trait]
impl RoleMembershipGateway for HttpRoleAdminGateway {
    async fn list_role_members(&self, role_id: RoleId) -> AppResult<Vec<UserSummary>> {
        let url = self.endpoint(&["roles", role_id.to_string().as_str(), "users"])?;
        Ok(self
            .get_list::<UserResponse>(url, "list role members")
            .await?
            .into_iter()
            .map(UserSummary::from)
            .collect())
    }

    async fn assign_user_to_role(&self, role_id: RoleId, user_id: UserId) -> AppResult<()> {
        let url = self.endpoint(&[
            "roles",
            role_id.to_string().as_str(),
            "users",
            user_id.to_string().as_str(),
        ])?;

        match self.send(self.request(Method::POST, url), "assign role").await {
            Ok(_) => Ok(()),
            Err(AppError::Conflict(detail)) => {
                debug!(role_id = %role_id, user_id = %user_id, detail, "user already holds role");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    async fn unassign_user_from_role(&self, role_id: RoleId, user_id: UserId) -> AppResult<()> {
        let url = self.endpoint(&[
            "roles",
            role_id.to_string().as_str(),
            "users",
            user_id.to_string().as_str(),
        ])?;

        match self
            .send(self.request(Method::DELETE, url), "unassign role")
            .await
        {
            Ok(_) => Ok(()),
            Err(AppError::NotFound(detail)) => {
                // A 404 also covers a role deleted since the members were read.
                self.get_role(role_id).await?;
                debug!(role_id = %role_id, user_id = %user_id, detail, "user does not hold role");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}
