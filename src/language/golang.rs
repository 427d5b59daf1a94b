// Go tracer provisioning
//
// Only module-based projects are instrumented: without a go.mod there is
// nothing to pin the instrumentation tool into, so the provisioner skips
// quietly. The version-gated strategy additionally requires a minimum Go
// toolchain before touching the module.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::core::TracedLanguage;
use crate::envvar;
use crate::error::{Result, ToolchainError};
use crate::version::DottedVersion;

use super::traits::{LanguageProvisioner, ProvisionContext};

/// Module manifest that marks a Go project as instrumentable.
pub const GO_MODULE_MANIFEST: &str = "go.mod";

const INSTRUMENTATION_TOOL: &str = "github.com/DataDog/orchestrion";

/// Oldest Go toolchain the instrumentation tool supports.
const MIN_SUPPORTED_GO: [u64; 2] = [1, 18];

#[derive(Debug, Default)]
pub struct GolangProvisioner {
    minimum_version: Option<DottedVersion>,
}

impl GolangProvisioner {
    /// Strategy that always attempts the tool install.
    pub fn new() -> Self {
        Self {
            minimum_version: None,
        }
    }

    /// Strategy gated on the installed toolchain version.
    pub fn with_minimum_version(minimum_version: DottedVersion) -> Self {
        Self {
            minimum_version: Some(minimum_version),
        }
    }

    /// The version-gated strategy with the default minimum.
    pub fn version_gated() -> Self {
        Self::with_minimum_version(DottedVersion::from_components(MIN_SUPPORTED_GO))
    }
}

#[async_trait]
impl LanguageProvisioner for GolangProvisioner {
    fn language(&self) -> TracedLanguage {
        TracedLanguage::Go
    }

    async fn configure(&self, ctx: &ProvisionContext<'_>) -> Result<HashMap<String, String>> {
        if !ctx.workspace.join(GO_MODULE_MANIFEST).is_file() {
            debug!("No go.mod in workspace, skipping Go tracer provisioning");
            return Ok(HashMap::new());
        }

        if which::which("go").is_err() {
            return Err(ToolchainError::NotFound {
                tool: "go".to_string(),
                language: TracedLanguage::Go,
            }
            .into());
        }

        let executor = ctx.executor();

        if let Some(minimum) = &self.minimum_version {
            let installed = executor.execute(parse_go_version, &["go", "version"]).await?;
            if installed < *minimum {
                return Err(ToolchainError::UnsupportedVersion {
                    tool: "go".to_string(),
                    found: installed.to_string(),
                    minimum: minimum.to_string(),
                }
                .into());
            }
        }

        let pinned = format!("{INSTRUMENTATION_TOOL}@latest");
        executor
            .execute(|_| Ok(()), &["go", "install", pinned.as_str()])
            .await?;
        executor
            .execute(|_| Ok(()), &["go", "get", INSTRUMENTATION_TOOL])
            .await?;
        executor.execute(|_| Ok(()), &["go", "mod", "tidy"]).await?;

        let mut variables = HashMap::new();
        variables.insert(
            "GOFLAGS".to_string(),
            envvar::prepend(ctx.env, "GOFLAGS", "-toolexec=\"orchestrion toolexec\""),
        );

        info!("Go tracer configured");
        Ok(variables)
    }
}

/// Pull the `go<dotted>` token out of `go version` output, e.g.
/// `go version go1.22.3 linux/amd64` -> `1.22.3`.
fn parse_go_version(output: &str) -> Result<DottedVersion> {
    output
        .split_whitespace()
        .filter_map(|token| token.strip_prefix("go"))
        .find_map(|rest| DottedVersion::parse(rest).ok())
        .ok_or_else(|| {
            ToolchainError::MalformedVersion {
                value: output.trim().to_string(),
            }
            .into()
        })
}
