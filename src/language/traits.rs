// Core LanguageProvisioner trait definition for the strategy architecture

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use crate::config::ProvisioningSettings;
use crate::core::NodeInfo;
use crate::error::Result;
use crate::process::CommandExecutor;

/// Everything a provisioner needs for one configure call: the job's
/// settings, the node, the workspace and the build's current environment.
#[derive(Debug, Clone, Copy)]
pub struct ProvisionContext<'a> {
    pub settings: &'a ProvisioningSettings,
    pub node: &'a NodeInfo,
    pub workspace: &'a Path,
    pub env: &'a HashMap<String, String>,
}

impl ProvisionContext<'_> {
    /// Executor rooted in the workspace with the job's command timeout and
    /// an empty overlay.
    pub fn executor(&self) -> CommandExecutor {
        CommandExecutor::new(self.workspace, HashMap::new())
            .with_timeout(self.settings.command_timeout)
    }
}

/// Strategy contract implemented once per traced language.
///
/// `configure` detects the toolchain, performs the installation and returns
/// the environment-variable contributions for the build. It fails with a
/// [`crate::error::ProvisionError`] when the toolchain is absent or
/// incompatible (a skip at the coordinator level), or when installation,
/// download or signature verification fails (fail-closed for the whole
/// aggregate).
#[async_trait]
pub trait LanguageProvisioner: Send + Sync {
    fn language(&self) -> crate::core::TracedLanguage;

    async fn configure(&self, ctx: &ProvisionContext<'_>) -> Result<HashMap<String, String>>;

    /// Best-effort check of whether a previously provisioned artifact is
    /// still usable. Advisory, not authoritative; implementations fail
    /// closed and return false on any internal error.
    async fn is_configuration_valid(&self, _node: &NodeInfo, _workspace: &Path) -> bool {
        true
    }
}
