use serde_json::{Value, json};

use kbprov_config::{
    DEFAULT_EF_CONSTRUCTION, DEFAULT_HNSW_M, DEFAULT_INDEX_DIMENSION, DEFAULT_INDEX_ENGINE,
    DEFAULT_INDEX_METHOD, IndexConfig,
};
use kbprov_utils::LogicalPrefix;

/// Vector field construction parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub dimension: u32,
    pub engine: String,
    pub method: String,
    pub ef_construction: u32,
    pub m: u32,
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_INDEX_DIMENSION,
            engine: DEFAULT_INDEX_ENGINE.to_string(),
            method: DEFAULT_INDEX_METHOD.to_string(),
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            m: DEFAULT_HNSW_M,
        }
    }
}

impl From<&IndexConfig> for IndexSpec {
    fn from(config: &IndexConfig) -> Self {
        Self {
            dimension: config.dimension(),
            engine: config.engine().to_string(),
            method: config.method().to_string(),
            ef_construction: config.ef_construction(),
            m: config.m(),
        }
    }
}

/// Create-index request body with a single `{prefix}-vector` knn field
#[must_use]
pub fn index_body(prefix: &LogicalPrefix, spec: &IndexSpec) -> Value {
    let mut properties = serde_json::Map::new();
    properties.insert(
        prefix.vector_field(),
        json!({
            "type": "knn_vector",
            "dimension": spec.dimension,
            "method": {
                "name": spec.method,
                "engine": spec.engine,
                "parameters": {
                    "ef_construction": spec.ef_construction,
                    "m": spec.m,
                },
            },
        }),
    );

    json!({
        "settings": { "index.knn": true },
        "mappings": { "properties": properties },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_body_matches_fixed_vector_configuration() {
        let prefix = LogicalPrefix::new("acme").unwrap();
        let body = index_body(&prefix, &IndexSpec::default());

        assert_eq!(body["settings"]["index.knn"], true);
        let field = &body["mappings"]["properties"]["acme-vector"];
        assert_eq!(field["type"], "knn_vector");
        assert_eq!(field["dimension"], 1536);
        assert_eq!(field["method"]["name"], "hnsw");
        assert_eq!(field["method"]["engine"], "faiss");
        assert_eq!(field["method"]["parameters"]["ef_construction"], 512);
        assert_eq!(field["method"]["parameters"]["m"], 16);
    }

    #[test]
    fn spec_follows_config_overrides() {
        let config = IndexConfig {
            dimension: Some(1024),
            engine: Some("nmslib".to_string()),
            ..IndexConfig::default()
        };
        let spec = IndexSpec::from(&config);
        assert_eq!(spec.dimension, 1024);
        assert_eq!(spec.engine, "nmslib");
        assert_eq!(spec.m, 16);
    }
}
