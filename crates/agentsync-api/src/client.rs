//! The [`ApiClient`] trait — the single abstraction boundary between the
//! reconciliation core and the remote agent-platform tenant.
//!
//! All core modules (loader, merge, diff, apply, upgrade, batch) interact
//! with the remote platform exclusively through this trait and its
//! sub-client traits. No core module constructs an HTTP request directly;
//! instead they depend on `agentsync-api` and program against the traits
//! below. This mirrors `maw-git::GitRepo`: one object-safe trait per
//! concern, grouped by the operations the core actually calls (§6.3).

use crate::cancel::CancellationToken;
use crate::error::ApiError;
use crate::types::{ListParams, RemoteResource};

/// Sub-client for memory block resources.
pub trait BlocksClient {
    /// List blocks, optionally filtered/paginated.
    fn list(&self, params: &ListParams) -> Result<Vec<RemoteResource>, ApiError>;
    /// Fetch a single block by remote id.
    fn retrieve(&self, id: &str) -> Result<RemoteResource, ApiError>;
    /// Create a block; returns the created resource (with its new id).
    fn create(&self, body: &RemoteResource) -> Result<RemoteResource, ApiError>;
    /// Update a block in place.
    fn update(&self, id: &str, body: &RemoteResource) -> Result<RemoteResource, ApiError>;
    /// Delete a block. Must tolerate "not found" as idempotent success.
    fn delete(&self, id: &str) -> Result<(), ApiError>;
}

/// Sub-client for tool functions.
pub trait ToolsClient {
    /// List tools, optionally filtered/paginated.
    fn list(&self, params: &ListParams) -> Result<Vec<RemoteResource>, ApiError>;
    /// Fetch a single tool by remote id.
    fn retrieve(&self, id: &str) -> Result<RemoteResource, ApiError>;
    /// Create a tool; returns the created resource (with its new id).
    fn create(&self, body: &RemoteResource) -> Result<RemoteResource, ApiError>;
    /// Update a tool in place.
    fn update(&self, id: &str, body: &RemoteResource) -> Result<RemoteResource, ApiError>;
    /// Delete a tool. Must tolerate "not found" as idempotent success.
    fn delete(&self, id: &str) -> Result<(), ApiError>;
}

/// Sub-client for knowledge-source folders.
pub trait FoldersClient {
    /// List folders, optionally filtered/paginated.
    fn list(&self, params: &ListParams) -> Result<Vec<RemoteResource>, ApiError>;
    /// Create a folder; returns the created resource (with its new id).
    fn create(&self, body: &RemoteResource) -> Result<RemoteResource, ApiError>;
    /// Update a folder in place.
    fn update(&self, id: &str, body: &RemoteResource) -> Result<RemoteResource, ApiError>;
    /// Delete a folder. Must tolerate "not found" as idempotent success.
    fn delete(&self, id: &str) -> Result<(), ApiError>;
    /// List the agent ids currently attached to a folder.
    fn list_agents(&self, id: &str) -> Result<Vec<String>, ApiError>;
}

/// Sub-client for user identities.
pub trait IdentitiesClient {
    /// List identities, optionally filtered/paginated.
    fn list(&self, params: &ListParams) -> Result<Vec<RemoteResource>, ApiError>;
    /// Fetch a single identity by remote id.
    fn retrieve(&self, id: &str) -> Result<RemoteResource, ApiError>;
    /// Create an identity; returns the created resource (with its new id).
    fn create(&self, body: &RemoteResource) -> Result<RemoteResource, ApiError>;
    /// Create-or-update by identifier key.
    fn upsert(&self, body: &RemoteResource) -> Result<RemoteResource, ApiError>;
    /// Update an identity in place.
    fn update(&self, id: &str, body: &RemoteResource) -> Result<RemoteResource, ApiError>;
    /// Delete an identity. Must tolerate "not found" as idempotent success.
    fn delete(&self, id: &str) -> Result<(), ApiError>;
}

/// Sub-client for agents: listing/retrieval plus attach/detach of blocks,
/// tools, folders, and identities.
pub trait AgentsClient {
    /// List agents, optionally filtered/paginated.
    fn list(&self, params: &ListParams) -> Result<Vec<RemoteResource>, ApiError>;
    /// Fetch a single agent by remote id.
    fn retrieve(&self, id: &str) -> Result<RemoteResource, ApiError>;
    /// Update agent-level fields (tags, config).
    fn update(&self, id: &str, body: &RemoteResource) -> Result<RemoteResource, ApiError>;

    /// List block ids attached to an agent.
    fn list_blocks(&self, agent_id: &str) -> Result<Vec<String>, ApiError>;
    /// Attach a block to an agent. Idempotent: attaching an already-attached
    /// block succeeds.
    fn attach_block(&self, agent_id: &str, block_id: &str) -> Result<(), ApiError>;
    /// Detach a block from an agent. Idempotent: detaching an
    /// already-detached (or missing) block succeeds.
    fn detach_block(&self, agent_id: &str, block_id: &str) -> Result<(), ApiError>;

    /// List tool ids attached to an agent.
    fn list_tools(&self, agent_id: &str) -> Result<Vec<String>, ApiError>;
    /// Attach a tool to an agent. Idempotent.
    fn attach_tool(&self, agent_id: &str, tool_id: &str) -> Result<(), ApiError>;
    /// Detach a tool from an agent. Idempotent.
    fn detach_tool(&self, agent_id: &str, tool_id: &str) -> Result<(), ApiError>;

    /// List folder ids attached to an agent.
    fn list_folders(&self, agent_id: &str) -> Result<Vec<String>, ApiError>;
    /// Attach a folder to an agent. Idempotent.
    fn attach_folder(&self, agent_id: &str, folder_id: &str) -> Result<(), ApiError>;
    /// Detach a folder from an agent. Idempotent.
    fn detach_folder(&self, agent_id: &str, folder_id: &str) -> Result<(), ApiError>;

    /// Attach an identity to an agent. Idempotent.
    fn attach_identity(&self, agent_id: &str, identity_id: &str) -> Result<(), ApiError>;
    /// Detach an identity from an agent. Idempotent.
    fn detach_identity(&self, agent_id: &str, identity_id: &str) -> Result<(), ApiError>;
}

/// Sub-client for MCP server attachments (observe-only per §4.9 — no
/// mutating methods are exposed, matching the diff engine's contract).
pub trait McpServersClient {
    /// List configured MCP servers, optionally filtered/paginated.
    fn list(&self, params: &ListParams) -> Result<Vec<RemoteResource>, ApiError>;
}

/// The full typed remote-platform client: one sub-client per resource kind,
/// plus the ability to observe the caller's cancellation token.
///
/// A concrete implementation (an HTTP client against the agent platform)
/// lives outside this crate's scope (§1 Explicitly out of scope) — this
/// trait fixes only the surface the reconciliation core depends on.
pub trait ApiClient {
    /// Sub-client type for blocks.
    type Blocks: BlocksClient;
    /// Sub-client type for tools.
    type Tools: ToolsClient;
    /// Sub-client type for folders.
    type Folders: FoldersClient;
    /// Sub-client type for identities.
    type Identities: IdentitiesClient;
    /// Sub-client type for agents.
    type Agents: AgentsClient;
    /// Sub-client type for MCP servers.
    type McpServers: McpServersClient;

    /// Access the blocks sub-client.
    fn blocks(&self) -> &Self::Blocks;
    /// Access the tools sub-client.
    fn tools(&self) -> &Self::Tools;
    /// Access the folders sub-client.
    fn folders(&self) -> &Self::Folders;
    /// Access the identities sub-client.
    fn identities(&self) -> &Self::Identities;
    /// Access the agents sub-client.
    fn agents(&self) -> &Self::Agents;
    /// Access the MCP servers sub-client.
    fn mcp_servers(&self) -> &Self::McpServers;

    /// The cancellation token this client was constructed with, if any.
    /// Callers that need to abort a long-running batch poll this between
    /// actions (§5 Cancellation).
    fn cancellation(&self) -> Option<&CancellationToken> {
        None
    }
}
