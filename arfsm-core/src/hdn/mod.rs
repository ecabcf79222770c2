//! Clients for the external collaborators of §6: the knowledge/execution
//! service ("HDN" — concept graph, task executor, LLM gateway) and the
//! principles gate. Both are out of scope per §1; only their HTTP
//! contracts are implemented here.

pub mod client;
pub mod graph;
pub mod principles;
pub mod types;

pub use client::{HdnClient, HdnTimeouts};
pub use graph::{GraphClient, McpFallbackGraphClient};
pub use principles::{PrinciplesClient, PrinciplesDecision, PrinciplesMetrics};
pub use types::{
    BootstrapRequest, ExecuteResponse, GraphRow, InterpretResponse, QueryResponse, SearchResponse,
};
