//! `GraphClient` abstraction (§9 design note): the autonomy and knowledge
//! layers program against this trait rather than against the MCP/direct-API
//! HTTP shape directly.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

use super::client::HdnClient;
use super::types::GraphRow;

#[async_trait]
pub trait GraphClient: Send + Sync {
    async fn query(&self, cypher: &str, domain: &str) -> Result<Vec<GraphRow>>;
    async fn get_concept(&self, name: &str, domain: &str) -> Result<Option<GraphRow>>;
    /// One-hop neighbourhood query, used to enrich domain concepts in §4.5
    /// step 2.
    async fn neighbors(&self, name: &str, domain: &str) -> Result<Vec<GraphRow>>;
}

/// MCP-first, direct-API-fallback implementation (§6, §9). The MCP
/// `tools/call` path is attempted first; any error (transport, decode, or
/// non-2xx) falls back to the direct `/knowledge/query` endpoint.
pub struct McpFallbackGraphClient {
    hdn: std::sync::Arc<HdnClient>,
}

impl McpFallbackGraphClient {
    pub fn new(hdn: std::sync::Arc<HdnClient>) -> Self {
        Self { hdn }
    }

    async fn mcp_query(&self, cypher: &str, domain: &str) -> Result<Vec<GraphRow>> {
        let args = serde_json::json!({ "cypher": cypher, "domain": domain });
        let value = self.hdn.mcp_call("graph_query", &args).await?;
        let rows = value
            .get("result")
            .and_then(|r| r.get("results"))
            .cloned()
            .unwrap_or(Value::Null);
        serde_json::from_value(rows).map_err(|e| crate::error::Error::decode("mcp graph_query", e.to_string()))
    }

    async fn direct_query(&self, cypher: &str, domain: &str) -> Result<Vec<GraphRow>> {
        let body = serde_json::json!({ "query": cypher, "domain": domain });
        Ok(self.hdn.knowledge_query(&body).await?.results)
    }
}

#[async_trait]
impl GraphClient for McpFallbackGraphClient {
    async fn query(&self, cypher: &str, domain: &str) -> Result<Vec<GraphRow>> {
        match self.mcp_query(cypher, domain).await {
            Ok(rows) => Ok(rows),
            Err(_) => self.direct_query(cypher, domain).await,
        }
    }

    async fn get_concept(&self, name: &str, domain: &str) -> Result<Option<GraphRow>> {
        let rows = self.query(&format!("what is {name}"), domain).await?;
        Ok(rows.into_iter().next())
    }

    async fn neighbors(&self, name: &str, domain: &str) -> Result<Vec<GraphRow>> {
        self.query(&format!("related to {name}"), domain).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A fixed in-memory `GraphClient` for tests that don't want a live
    /// HDN instance.
    pub struct FakeGraphClient {
        pub rows: Vec<GraphRow>,
    }

    #[async_trait]
    impl GraphClient for FakeGraphClient {
        async fn query(&self, _cypher: &str, domain: &str) -> Result<Vec<GraphRow>> {
            Ok(self.rows.iter().filter(|r| r.domain == domain).cloned().collect())
        }

        async fn get_concept(&self, name: &str, domain: &str) -> Result<Option<GraphRow>> {
            Ok(self.rows.iter().find(|r| r.name == name && r.domain == domain).cloned())
        }

        async fn neighbors(&self, _name: &str, domain: &str) -> Result<Vec<GraphRow>> {
            Ok(self.rows.iter().filter(|r| r.domain == domain).cloned().collect())
        }
    }

    #[tokio::test]
    async fn fake_graph_client_filters_by_domain() {
        let client = FakeGraphClient {
            rows: vec![
                GraphRow { name: "neural network".into(), domain: "AI".into(), ..Default::default() },
                GraphRow { name: "mitochondria".into(), domain: "biology".into(), ..Default::default() },
            ],
        };
        let rows = client.query("all concepts", "AI").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "neural network");
    }
}
