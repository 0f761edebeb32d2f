//! MCP server observer (§4.3). MCP servers are never created, updated, or
//! deleted by this engine — remote credential setup is always manual. This
//! module only reports on configuration state so an operator knows what's
//! left to wire up by hand.

use std::fmt;

use agentsync_api::RemoteResource;

use crate::model::Resource;

/// The inferred credential configuration state of a server (§4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialStatus {
    /// The manifest declares no credential requirement at all.
    None,
    /// A credential is declared and the remote reports it present.
    Configured,
    /// The server authenticates via an interactive OAuth flow.
    OAuth,
    /// The manifest declares a credential requirement but the remote's
    /// configuration state could not be determined.
    Unknown,
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Configured => "configured",
            Self::OAuth => "oauth",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A single manual setup step surfaced to the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetupStep {
    /// What to do.
    pub description: String,
    /// Whether this step requires supplying a credential out of band.
    pub requires_credentials: bool,
}

/// The observed state of one MCP server against its manifest.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerReport {
    /// The server's manifest name.
    pub name: String,
    /// Inferred credential state.
    pub credential_status: CredentialStatus,
    /// Whether the remote has a matching server registered at all.
    pub server_configured: bool,
    /// Tool names the manifest expects this server to expose but the
    /// remote does not yet report.
    pub missing_tools: Vec<String>,
    /// Manual setup steps remaining.
    pub steps: Vec<SetupStep>,
}

/// A full observation pass over every `MCPServer` resource in desired
/// state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetupReport {
    /// One entry per manifest-declared server.
    pub servers: Vec<ServerReport>,
}

/// Output format for [`SetupReport::render`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    /// Plain indented text.
    Text,
    /// GitHub-flavored Markdown checklist.
    Markdown,
    /// Machine-readable JSON.
    Json,
}

impl SetupReport {
    /// Whether every declared server is fully configured with no missing
    /// tools and no outstanding credential steps.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.servers
            .iter()
            .all(|s| s.server_configured && s.missing_tools.is_empty() && s.steps.is_empty())
    }

    /// Render the report in the requested format.
    #[must_use]
    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Text => self.render_text(),
            ReportFormat::Markdown => self.render_markdown(),
            ReportFormat::Json => self.render_json(),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        for server in &self.servers {
            out.push_str(&format!(
                "{} [{}] configured={}\n",
                server.name, server.credential_status, server.server_configured
            ));
            for tool in &server.missing_tools {
                out.push_str(&format!("  missing tool: {tool}\n"));
            }
            for step in &server.steps {
                out.push_str(&format!("  - {}\n", step.description));
            }
        }
        out
    }

    fn render_markdown(&self) -> String {
        let mut out = String::new();
        for server in &self.servers {
            out.push_str(&format!("### {}\n\n", server.name));
            out.push_str(&format!("- credential status: `{}`\n", server.credential_status));
            out.push_str(&format!("- configured: `{}`\n", server.server_configured));
            for tool in &server.missing_tools {
                out.push_str(&format!("- [ ] register tool `{tool}`\n"));
            }
            for step in &server.steps {
                let marker = if step.requires_credentials { "requires credentials" } else { "no credentials needed" };
                out.push_str(&format!("- [ ] {} ({marker})\n", step.description));
            }
            out.push('\n');
        }
        out
    }

    fn render_json(&self) -> String {
        let servers: Vec<serde_json::Value> = self
            .servers
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "credentialStatus": s.credential_status.to_string(),
                    "serverConfigured": s.server_configured,
                    "missingTools": s.missing_tools,
                    "steps": s.steps.iter().map(|step| serde_json::json!({
                        "description": step.description,
                        "requiresCredentials": step.requires_credentials,
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();
        serde_json::json!({ "servers": servers }).to_string()
    }
}

/// Observe every manifest `MCPServer` resource against a remote listing.
#[must_use]
pub fn observe(desired: &[&Resource], remote: &[RemoteResource]) -> SetupReport {
    let servers = desired
        .iter()
        .map(|resource| observe_one(resource, remote))
        .collect();
    SetupReport { servers }
}

fn observe_one(resource: &Resource, remote: &[RemoteResource]) -> ServerReport {
    let name = resource.metadata.name.clone();
    let matched = remote.iter().find(|r| r.name == name);

    let credential_status = infer_credential_status(resource, matched);

    let expected_tools: Vec<String> = resource
        .spec
        .fields
        .get("expectedTools")
        .and_then(serde_json::Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect())
        .unwrap_or_default();
    let actual_tools: Vec<String> = matched
        .and_then(|r| r.fields.get("tools"))
        .and_then(serde_json::Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect())
        .unwrap_or_default();
    let missing_tools: Vec<String> = expected_tools.into_iter().filter(|t| !actual_tools.contains(t)).collect();

    let mut steps = Vec::new();
    if matched.is_none() {
        steps.push(SetupStep {
            description: format!("register MCP server '{name}' on the remote platform"),
            requires_credentials: false,
        });
    }
    if matches!(credential_status, CredentialStatus::None | CredentialStatus::Unknown) && requires_credential(resource) {
        steps.push(SetupStep {
            description: format!("supply a credential for '{name}'"),
            requires_credentials: true,
        });
    }

    ServerReport {
        name,
        credential_status,
        server_configured: matched.is_some(),
        missing_tools,
        steps,
    }
}

fn requires_credential(resource: &Resource) -> bool {
    resource.spec.fields.get("credentialType").is_some()
}

fn infer_credential_status(resource: &Resource, matched: Option<&RemoteResource>) -> CredentialStatus {
    let Some(credential_type) = resource.spec.str("credentialType") else {
        return CredentialStatus::None;
    };
    if credential_type == "oauth" {
        return CredentialStatus::OAuth;
    }
    match matched.and_then(|r| r.fields.get("credential_configured")).and_then(serde_json::Value::as_bool) {
        Some(true) => CredentialStatus::Configured,
        Some(false) => CredentialStatus::Unknown,
        None => CredentialStatus::Unknown,
    }
}
