use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TotangoError {
    #[error("Totango API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Totango request failed: {0}")]
    Http(String),
    #[error("Unexpected Totango response: {0}")]
    Decode(String),
    #[error("Unsupported update method: {0}")]
    Method(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// SCIM updates replace the resource by default; PATCH applies a partial change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMethod {
    #[default]
    Put,
    Patch,
}

impl FromStr for UpdateMethod {
    type Err = TotangoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            other => Err(TotangoError::Method(other.to_string())),
        }
    }
}

impl From<UpdateMethod> for Method {
    fn from(value: UpdateMethod) -> Self {
        match value {
            UpdateMethod::Put => Method::Put,
            UpdateMethod::Patch => Method::Patch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScimResource {
    Users,
    Groups,
}

impl ScimResource {
    fn segment(self) -> &'static str {
        match self {
            ScimResource::Users => "Users",
            ScimResource::Groups => "Groups",
        }
    }
}

fn scim_path(service_id: &str, resource: ScimResource, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("/api/v2/scim/{service_id}/{}/{id}", resource.segment()),
        None => format!("/api/v2/scim/{service_id}/{}", resource.segment()),
    }
}

/// Sends one request relative to the account's base URL. `None` means the
/// response had no body worth decoding (deletes).
#[async_trait]
pub trait TotangoTransport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>, TotangoError>;
}

pub struct TotangoApi<T: TotangoTransport> {
    transport: T,
}

impl<T: TotangoTransport> TotangoApi<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    async fn json(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, TotangoError> {
        Ok(self
            .transport
            .send(method, path, body)
            .await?
            .unwrap_or(Value::Null))
    }

    pub async fn get_touchpoint_types(&self) -> Result<Value, TotangoError> {
        self.json(Method::Get, "/api/v3/touchpoint-types", None).await
    }

    pub async fn post_account(&self, account: &Value) -> Result<Value, TotangoError> {
        self.json(Method::Post, "/int-hub/api/v1/accounts", Some(account))
            .await
    }

    pub async fn get_audit_log(&self) -> Result<Value, TotangoError> {
        self.json(Method::Get, "/api/v2/auditlog", None).await
    }

    pub async fn get_events(&self, account_id: &str) -> Result<Value, TotangoError> {
        self.json(Method::Get, &format!("/api/v2/accounts/{account_id}/events"), None)
            .await
    }

    pub async fn get_objective_status(&self) -> Result<Value, TotangoError> {
        self.json(Method::Get, "/api/v2/objectives/status", None).await
    }

    pub async fn get_objective_category(&self) -> Result<Value, TotangoError> {
        self.json(Method::Get, "/api/v2/objectives/category", None).await
    }

    pub async fn get_plan_summary(&self, account_id: &str) -> Result<Value, TotangoError> {
        self.json(
            Method::Get,
            &format!("/api/v2/accounts/{account_id}/plans/summary"),
            None,
        )
        .await
    }

    pub async fn get_outcome_report(&self, sbid: &str, account_id: &str) -> Result<Value, TotangoError> {
        self.json(
            Method::Get,
            &format!("/api/v2/plans/{sbid}/account/{account_id}/outcome"),
            None,
        )
        .await
    }

    pub async fn run_successplay(&self, payload: &Value) -> Result<Value, TotangoError> {
        self.json(Method::Post, "/api/v2/successplay/run", Some(payload))
            .await
    }

    pub async fn list_scim(&self, service_id: &str, resource: ScimResource) -> Result<Value, TotangoError> {
        self.json(Method::Get, &scim_path(service_id, resource, None), None)
            .await
    }

    pub async fn get_scim(
        &self,
        service_id: &str,
        resource: ScimResource,
        id: &str,
    ) -> Result<Value, TotangoError> {
        self.json(Method::Get, &scim_path(service_id, resource, Some(id)), None)
            .await
    }

    pub async fn create_scim_user(&self, service_id: &str, user: &Value) -> Result<Value, TotangoError> {
        self.json(
            Method::Post,
            &scim_path(service_id, ScimResource::Users, None),
            Some(user),
        )
        .await
    }

    pub async fn update_scim(
        &self,
        service_id: &str,
        resource: ScimResource,
        id: &str,
        payload: &Value,
        method: UpdateMethod,
    ) -> Result<Value, TotangoError> {
        self.json(
            method.into(),
            &scim_path(service_id, resource, Some(id)),
            Some(payload),
        )
        .await
    }

    pub async fn delete_scim(
        &self,
        service_id: &str,
        resource: ScimResource,
        id: &str,
    ) -> Result<(), TotangoError> {
        self.transport
            .send(Method::Delete, &scim_path(service_id, resource, Some(id)), None)
            .await?;
        tracing::info!(service_id, id, resource = resource.segment(), "Deleted SCIM resource");
        Ok(())
    }
}
