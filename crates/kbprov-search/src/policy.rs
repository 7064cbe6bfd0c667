//! Policy documents
//!
//! Every document is scoped to `collection/{prefix}` (and `index/{prefix}/*`
//! for the data access policy) and serialized to the JSON string the service
//! expects in its `policy` field.

use serde::Serialize;

use kbprov_utils::LogicalPrefix;

const COLLECTION_PERMISSIONS: [&str; 3] = [
    "aoss:DescribeCollectionItems",
    "aoss:CreateCollectionItems",
    "aoss:UpdateCollectionItems",
];

const INDEX_PERMISSIONS: [&str; 5] = [
    "aoss:UpdateIndex",
    "aoss:DescribeIndex",
    "aoss:ReadDocument",
    "aoss:WriteDocument",
    "aoss:CreateIndex",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ResourceRule {
    resource_type: &'static str,
    resource: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    permission: Option<Vec<&'static str>>,
}

impl ResourceRule {
    fn new(resource_type: &'static str, resource: String) -> Self {
        Self {
            resource_type,
            resource: vec![resource],
            permission: None,
        }
    }

    fn with_permissions(mut self, permissions: &[&'static str]) -> Self {
        self.permission = Some(permissions.to_vec());
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct EncryptionDocument {
    rules: Vec<ResourceRule>,
    #[serde(rename = "AWSOwnedKey")]
    aws_owned_key: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct NetworkStatement {
    allow_from_public: bool,
    rules: Vec<ResourceRule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AccessStatement<'a> {
    rules: Vec<ResourceRule>,
    principal: &'a [String],
    description: &'static str,
}

fn to_json<T: Serialize>(document: &T) -> String {
    // Plain structs of strings and bools always serialize
    serde_json::to_string(document).unwrap_or_default()
}

/// Encryption policy using an AWS-owned key
#[must_use]
pub fn encryption_policy(prefix: &LogicalPrefix) -> String {
    to_json(&EncryptionDocument {
        rules: vec![ResourceRule::new("collection", prefix.collection_resource())],
        aws_owned_key: true,
    })
}

/// Network policy allowing public access to the collection and its dashboard
#[must_use]
pub fn network_policy(prefix: &LogicalPrefix) -> String {
    to_json(&[NetworkStatement {
        allow_from_public: true,
        rules: vec![
            ResourceRule::new("dashboard", prefix.collection_resource()),
            ResourceRule::new("collection", prefix.collection_resource()),
        ],
    }])
}

/// Data access policy granting collection item and index permissions
#[must_use]
pub fn access_policy(prefix: &LogicalPrefix, principals: &[String]) -> String {
    to_json(&[AccessStatement {
        rules: vec![
            ResourceRule::new("collection", prefix.collection_resource())
                .with_permissions(&COLLECTION_PERMISSIONS),
            ResourceRule::new("index", prefix.index_resource())
                .with_permissions(&INDEX_PERMISSIONS),
        ],
        principal: principals,
        description: "",
    }])
}

/// Caller-supplied principals followed by the two roles every chain needs
#[must_use]
pub fn access_principals(
    caller_arns: &[String],
    knowledge_base_role: &str,
    orchestrator_role: &str,
) -> Vec<String> {
    caller_arns
        .iter()
        .cloned()
        .chain([knowledge_base_role.to_string(), orchestrator_role.to_string()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{Value, json};

    fn prefix() -> LogicalPrefix {
        LogicalPrefix::new("acme").unwrap()
    }

    #[test]
    fn encryption_document_shape() {
        let doc: Value = serde_json::from_str(&encryption_policy(&prefix())).unwrap();
        assert_eq!(
            doc,
            json!({
                "Rules": [{"ResourceType": "collection", "Resource": ["collection/acme"]}],
                "AWSOwnedKey": true
            })
        );
    }

    #[test]
    fn network_document_covers_dashboard_and_collection() {
        let doc: Value = serde_json::from_str(&network_policy(&prefix())).unwrap();
        assert_eq!(
            doc,
            json!([{
                "AllowFromPublic": true,
                "Rules": [
                    {"ResourceType": "dashboard", "Resource": ["collection/acme"]},
                    {"ResourceType": "collection", "Resource": ["collection/acme"]}
                ]
            }])
        );
    }

    #[test]
    fn access_document_scopes_index_rule() {
        let principals = vec!["arn:aws:iam::1:role/kb".to_string()];
        let doc: Value = serde_json::from_str(&access_policy(&prefix(), &principals)).unwrap();
        let statement = &doc[0];
        assert_eq!(statement["Description"], "");
        assert_eq!(statement["Principal"], json!(["arn:aws:iam::1:role/kb"]));
        assert_eq!(statement["Rules"][0]["Resource"], json!(["collection/acme"]));
        assert_eq!(statement["Rules"][0]["Permission"].as_array().unwrap().len(), 3);
        assert_eq!(statement["Rules"][1]["ResourceType"], "index");
        assert_eq!(statement["Rules"][1]["Resource"], json!(["index/acme/*"]));
        assert_eq!(statement["Rules"][1]["Permission"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn empty_caller_list_leaves_two_principals() {
        let principals = access_principals(&[], "arn:kb-role", "arn:orchestrator-role");
        assert_eq!(principals, vec!["arn:kb-role", "arn:orchestrator-role"]);
    }

    proptest! {
        #[test]
        fn principals_always_end_with_both_roles(
            callers in proptest::collection::vec("arn:aws:iam::[0-9]{12}:role/[a-z]{1,8}", 0..6)
        ) {
            let principals = access_principals(&callers, "arn:kb-role", "arn:orchestrator-role");
            prop_assert_eq!(principals.len(), callers.len() + 2);
            prop_assert_eq!(&principals[..callers.len()], &callers[..]);
            prop_assert_eq!(principals[callers.len()].as_str(), "arn:kb-role");
            prop_assert_eq!(principals[callers.len() + 1].as_str(), "arn:orchestrator-role");

            let doc: Value = serde_json::from_str(&access_policy(&prefix(), &principals)).unwrap();
            prop_assert_eq!(doc[0]["Principal"].as_array().unwrap().len(), callers.len() + 2);
        }
    }
}
