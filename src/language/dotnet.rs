// .NET tracer provisioning
//
// Installs the dd-trace CLI tool into the workspace tracer home and lets
// the tool's own `ci configure` subcommand emit the environment it needs.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;

use crate::core::TracedLanguage;
use crate::error::{Result, ToolchainError};

use super::traits::{LanguageProvisioner, ProvisionContext};
use super::tracer_home;

const TRACER_TOOL: &str = "dd-trace";

#[derive(Debug, Default)]
pub struct DotnetProvisioner;

impl DotnetProvisioner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageProvisioner for DotnetProvisioner {
    fn language(&self) -> TracedLanguage {
        TracedLanguage::Dotnet
    }

    async fn configure(&self, ctx: &ProvisionContext<'_>) -> Result<HashMap<String, String>> {
        if which::which("dotnet").is_err() {
            return Err(ToolchainError::NotFound {
                tool: "dotnet".to_string(),
                language: TracedLanguage::Dotnet,
            }
            .into());
        }

        let executor = ctx.executor();
        let sdk_version = executor
            .execute(|out| Ok(out.trim().to_string()), &["dotnet", "--version"])
            .await?;

        let home = tracer_home(ctx.workspace)?;
        let tool_path = home.to_string_lossy().to_string();
        executor
            .execute(
                |_| Ok(()),
                &[
                    "dotnet",
                    "tool",
                    "update",
                    TRACER_TOOL,
                    "--tool-path",
                    tool_path.as_str(),
                ],
            )
            .await?;

        let tool = home.join(TRACER_TOOL);
        let tool_argv = tool.to_string_lossy().to_string();
        let variables = executor
            .execute(
                |out| Ok(parse_env_lines(out)),
                &[tool_argv.as_str(), "ci", "configure"],
            )
            .await?;

        info!(sdk_version = %sdk_version, count = variables.len(), ".NET tracer configured");
        Ok(variables)
    }
}

/// Parse `KEY=VALUE` lines into a map, verbatim.
///
/// Tokens without `=` are ignored; `KEY=` yields an empty value.
fn parse_env_lines(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| {
            let token = line.trim();
            token
                .split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .map(|(key, value)| (key.to_string(), value.to_string()))
        })
        .collect()
}
