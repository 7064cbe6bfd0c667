//! Lifecycle trigger contract
//!
//! Events and responses use the custom-resource wire names (`RequestType`,
//! `ResourceProperties`, `PhysicalResourceId`, ...). Resource properties
//! accept both the short names and the `knowledgeBase*` names used by the
//! declarative stack.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use kbprov_utils::{LogicalPrefix, ProvisionError};

/// Fallback physical resource id when the execution context names nothing
pub const DEFAULT_PHYSICAL_RESOURCE_ID: &str = "kbprov";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl RequestType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property bag of one lifecycle event
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProperties {
    pub prefix: Option<String>,
    #[serde(alias = "knowledgeBaseRoleArn")]
    pub role_arn: Option<String>,
    #[serde(alias = "knowledgeBaseEmbeddingModelArn")]
    pub embedding_model_arn: Option<String>,
    #[serde(alias = "knowledgeBaseBucketArn")]
    pub bucket_arn: Option<String>,
    /// The orchestrator's own execution role
    #[serde(alias = "knowledgeBaseCustomResourceRole")]
    pub custom_resource_role_arn: Option<String>,
    /// JSON-encoded string array, or a plain array
    pub access_policy_arns: Option<Value>,
}

/// Incoming lifecycle event
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    pub request_type: RequestType,
    #[serde(default)]
    pub resource_properties: ResourceProperties,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub logical_resource_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
}

/// Validated input to the provisioning chains.
///
/// Only `prefix` is required for `Update` and `Delete`; the other fields are
/// empty for those request types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    pub request_type: RequestType,
    pub prefix: LogicalPrefix,
    pub role_arn: String,
    pub embedding_model_arn: String,
    pub bucket_arn: String,
    pub access_policy_principal_arns: Vec<String>,
    pub orchestrator_role_arn: String,
}

fn required(value: Option<&String>, name: &str) -> Result<String, ProvisionError> {
    match value.map(|v| v.trim()) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ProvisionError::InvalidRequest(format!(
            "missing resource property {name}"
        ))),
    }
}

/// Parse `accessPolicyArns` from either encoding
///
/// # Errors
///
/// `InvalidRequest` when the value is not a list of strings.
pub fn parse_principal_arns(value: Option<&Value>) -> Result<Vec<String>, ProvisionError> {
    let invalid = |detail: String| {
        ProvisionError::InvalidRequest(format!("accessPolicyArns must be a string array: {detail}"))
    };
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(encoded)) if encoded.trim().is_empty() => Ok(Vec::new()),
        Some(Value::String(encoded)) => {
            serde_json::from_str::<Vec<String>>(encoded).map_err(|e| invalid(e.to_string()))
        }
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(format!("non-string element {item}")))
            })
            .collect(),
        Some(other) => Err(invalid(format!("got {other}"))),
    }
}

impl LifecycleEvent {
    /// Raw prefix for log context, before validation
    #[must_use]
    pub fn prefix_hint(&self) -> &str {
        self.resource_properties.prefix.as_deref().unwrap_or("")
    }

    /// Validate the event into a `ProvisioningRequest`.
    ///
    /// `default_role_arn` stands in for the orchestrator's own role when the
    /// event does not carry it.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for an invalid prefix, a malformed principal list, or
    /// a `Create` missing any required property.
    pub fn to_request(
        &self,
        default_role_arn: Option<&str>,
    ) -> Result<ProvisioningRequest, ProvisionError> {
        let props = &self.resource_properties;
        let prefix = LogicalPrefix::new(required(props.prefix.as_ref(), "prefix")?)?;

        if self.request_type != RequestType::Create {
            return Ok(ProvisioningRequest {
                request_type: self.request_type,
                prefix,
                role_arn: String::new(),
                embedding_model_arn: String::new(),
                bucket_arn: String::new(),
                access_policy_principal_arns: Vec::new(),
                orchestrator_role_arn: String::new(),
            });
        }

        let orchestrator_role = props
            .custom_resource_role_arn
            .clone()
            .or_else(|| default_role_arn.map(str::to_string));

        Ok(ProvisioningRequest {
            request_type: self.request_type,
            prefix,
            role_arn: required(props.role_arn.as_ref(), "roleArn")?,
            embedding_model_arn: required(props.embedding_model_arn.as_ref(), "embeddingModelArn")?,
            bucket_arn: required(props.bucket_arn.as_ref(), "bucketArn")?,
            access_policy_principal_arns: parse_principal_arns(props.access_policy_arns.as_ref())?,
            orchestrator_role_arn: required(orchestrator_role.as_ref(), "customResourceRoleArn")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Outgoing lifecycle response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl LifecycleResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// Where the handler runs; the source of `PhysicalResourceId`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    pub log_group_name: Option<String>,
    pub function_name: Option<String>,
    /// Explicit id from configuration; wins over both names
    pub physical_resource_id: Option<String>,
}

impl ExecutionContext {
    /// Read the Lambda runtime environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());
        Self {
            log_group_name: non_empty("AWS_LAMBDA_LOG_GROUP_NAME"),
            function_name: non_empty("AWS_LAMBDA_FUNCTION_NAME"),
            physical_resource_id: None,
        }
    }

    #[must_use]
    pub fn with_physical_resource_id(mut self, id: Option<String>) -> Self {
        self.physical_resource_id = id;
        self
    }

    /// Stable across invocations of the same deployed handler
    #[must_use]
    pub fn physical_resource_id(&self) -> String {
        self.physical_resource_id
            .as_ref()
            .or(self.log_group_name.as_ref())
            .or(self.function_name.as_ref())
            .cloned()
            .unwrap_or_else(|| DEFAULT_PHYSICAL_RESOURCE_ID.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_event(properties: Value) -> LifecycleEvent {
        serde_json::from_value(json!({
            "RequestType": "Create",
            "ResourceProperties": properties,
            "StackId": "stack-1",
            "RequestId": "req-1",
            "LogicalResourceId": "KnowledgeBase",
            "ResponseURL": "https://example.invalid",
            "ServiceToken": "arn:aws:lambda:provider"
        }))
        .unwrap()
    }

    #[test]
    fn parses_original_property_names() {
        let event = create_event(json!({
            "ServiceToken": "arn:aws:lambda:provider",
            "prefix": "acme",
            "knowledgeBaseRoleArn": "arn:kb-role",
            "knowledgeBaseEmbeddingModelArn": "m1",
            "knowledgeBaseBucketArn": "b1",
            "knowledgeBaseCustomResourceRole": "arn:own-role",
            "accessPolicyArns": "[\"arn:extra\"]"
        }));
        let request = event.to_request(None).unwrap();
        assert_eq!(request.prefix.as_str(), "acme");
        assert_eq!(request.role_arn, "arn:kb-role");
        assert_eq!(request.embedding_model_arn, "m1");
        assert_eq!(request.bucket_arn, "b1");
        assert_eq!(request.orchestrator_role_arn, "arn:own-role");
        assert_eq!(request.access_policy_principal_arns, vec!["arn:extra"]);
    }

    #[test]
    fn parses_short_property_names_and_array() {
        let event = create_event(json!({
            "prefix": "acme",
            "roleArn": "arn:kb-role",
            "embeddingModelArn": "m1",
            "bucketArn": "b1",
            "accessPolicyArns": ["arn:a", "arn:b"]
        }));
        let request = event.to_request(Some("arn:configured-role")).unwrap();
        assert_eq!(request.orchestrator_role_arn, "arn:configured-role");
        assert_eq!(request.access_policy_principal_arns.len(), 2);
    }

    #[test]
    fn create_without_orchestrator_role_is_invalid() {
        let event = create_event(json!({
            "prefix": "acme",
            "roleArn": "arn:kb-role",
            "embeddingModelArn": "m1",
            "bucketArn": "b1"
        }));
        let err = event.to_request(None).unwrap_err();
        assert!(err.to_string().contains("customResourceRoleArn"));
    }

    #[test]
    fn delete_needs_only_prefix() {
        let event: LifecycleEvent = serde_json::from_value(json!({
            "RequestType": "Delete",
            "ResourceProperties": {"prefix": "acme"},
            "PhysicalResourceId": "log-group"
        }))
        .unwrap();
        let request = event.to_request(None).unwrap();
        assert_eq!(request.request_type, RequestType::Delete);
        assert!(request.role_arn.is_empty());
    }

    #[test]
    fn invalid_prefix_is_rejected() {
        let event = create_event(json!({"prefix": "Not Valid"}));
        assert!(matches!(
            event.to_request(None),
            Err(ProvisionError::InvalidRequest(_))
        ));
    }

    #[test]
    fn principal_list_encodings() {
        assert!(parse_principal_arns(None).unwrap().is_empty());
        assert!(parse_principal_arns(Some(&json!("[]"))).unwrap().is_empty());
        assert_eq!(
            parse_principal_arns(Some(&json!("[\"arn:x\"]"))).unwrap(),
            vec!["arn:x"]
        );
        assert!(parse_principal_arns(Some(&json!("not json"))).is_err());
        assert!(parse_principal_arns(Some(&json!([1, 2]))).is_err());
        assert!(parse_principal_arns(Some(&json!({"a": 1}))).is_err());
    }

    #[test]
    fn response_uses_wire_names() {
        let response = LifecycleResponse {
            status: ResponseStatus::Failed,
            reason: "boom".to_string(),
            physical_resource_id: "pid".to_string(),
            stack_id: "s".to_string(),
            request_id: "r".to_string(),
            logical_resource_id: "l".to_string(),
            data: BTreeMap::new(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["Status"], "FAILED");
        assert_eq!(value["PhysicalResourceId"], "pid");
        assert!(value.get("Data").is_none());
    }

    #[test]
    fn physical_resource_id_fallbacks() {
        let ctx = ExecutionContext::from_lookup(|name| match name {
            "AWS_LAMBDA_LOG_GROUP_NAME" => Some("/aws/lambda/kb".to_string()),
            "AWS_LAMBDA_FUNCTION_NAME" => Some("kb".to_string()),
            _ => None,
        });
        assert_eq!(ctx.physical_resource_id(), "/aws/lambda/kb");

        let ctx = ExecutionContext::from_lookup(|name| {
            (name == "AWS_LAMBDA_FUNCTION_NAME").then(|| "kb".to_string())
        });
        assert_eq!(ctx.physical_resource_id(), "kb");

        let ctx = ExecutionContext::default();
        assert_eq!(ctx.physical_resource_id(), DEFAULT_PHYSICAL_RESOURCE_ID);

        let ctx = ctx.with_physical_resource_id(Some("fixed".to_string()));
        assert_eq!(ctx.physical_resource_id(), "fixed");
    }
}
