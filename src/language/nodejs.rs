// JavaScript tracer provisioning
//
// Installs dd-trace as an isolated global package under the workspace
// tracer home. Installing into the default global root would need
// privileges the build may not have, and touching the project's own
// manifest would be reverted by the next SCM checkout.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::{NodeInfo, TracedLanguage};
use crate::envvar;
use crate::error::{Result, ToolchainError};
use crate::version::SemanticVersion;

use super::traits::{LanguageProvisioner, ProvisionContext};
use super::tracer_home;

const TRACER_PACKAGE: &str = "dd-trace";

fn min_supported_npm() -> SemanticVersion {
    SemanticVersion::new(6, 0, 0)
}

#[derive(Debug, Default)]
pub struct NodejsProvisioner;

impl NodejsProvisioner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageProvisioner for NodejsProvisioner {
    fn language(&self) -> TracedLanguage {
        TracedLanguage::Javascript
    }

    async fn configure(&self, ctx: &ProvisionContext<'_>) -> Result<HashMap<String, String>> {
        if which::which("npm").is_err() {
            return Err(ToolchainError::NotFound {
                tool: "npm".to_string(),
                language: TracedLanguage::Javascript,
            }
            .into());
        }

        let executor = ctx.executor();
        let npm_version = executor
            .execute(
                |out| SemanticVersion::parse(out.trim()).map_err(Into::into),
                &["npm", "--version"],
            )
            .await?;

        let minimum = min_supported_npm();
        if npm_version < minimum {
            return Err(ToolchainError::UnsupportedVersion {
                tool: "npm".to_string(),
                found: npm_version.to_string(),
                minimum: minimum.to_string(),
            }
            .into());
        }

        let home = tracer_home(ctx.workspace)?;
        let prefix = home.to_string_lossy().to_string();
        executor
            .execute(
                |_| Ok(()),
                &[
                    "npm",
                    "install",
                    "-g",
                    TRACER_PACKAGE,
                    "--prefix",
                    prefix.as_str(),
                ],
            )
            .await?;

        let mut variables = HashMap::new();
        variables.insert(
            "NODE_OPTIONS".to_string(),
            envvar::prepend(ctx.env, "NODE_OPTIONS", &preload_flag(&home)),
        );

        info!(npm_version = %npm_version, "JavaScript tracer configured");
        Ok(variables)
    }

    async fn is_configuration_valid(&self, _node: &NodeInfo, workspace: &Path) -> bool {
        installed_package_dir(&workspace.join(super::TRACER_HOME_DIR)).is_dir()
    }
}

fn installed_package_dir(home: &Path) -> PathBuf {
    home.join("lib").join("node_modules").join(TRACER_PACKAGE)
}

/// Module-preload flag pointing at the tracer's CI entrypoint.
fn preload_flag(home: &Path) -> String {
    let init = installed_package_dir(home).join("ci").join("init");
    format!("-r {}", init.display())
}
