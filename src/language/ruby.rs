// Ruby tracer provisioning
//
// Adds the tracer gem through bundler and requires its auto-instrumentation
// entrypoint from RUBYOPT. Bundler may run with a frozen lockfile in CI;
// the add command gets BUNDLE_FROZEN=false in its own overlay so the
// unfreeze never outlives the command.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;

use crate::core::TracedLanguage;
use crate::envvar;
use crate::error::{Result, ToolchainError};

use super::traits::{LanguageProvisioner, ProvisionContext};

const TRACER_GEM: &str = "datadog-ci";
const AUTO_INSTRUMENT_FLAG: &str = "-rdatadog/ci/auto_instrument";

#[derive(Debug, Default)]
pub struct RubyProvisioner;

impl RubyProvisioner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageProvisioner for RubyProvisioner {
    fn language(&self) -> TracedLanguage {
        TracedLanguage::Ruby
    }

    async fn configure(&self, ctx: &ProvisionContext<'_>) -> Result<HashMap<String, String>> {
        for tool in ["ruby", "bundle", "gem"] {
            if which::which(tool).is_err() {
                return Err(ToolchainError::NotFound {
                    tool: tool.to_string(),
                    language: TracedLanguage::Ruby,
                }
                .into());
            }
        }

        ctx.executor()
            .with_env("BUNDLE_FROZEN", "false")
            .execute(|_| Ok(()), &["bundle", "add", TRACER_GEM])
            .await?;

        let mut variables = HashMap::new();
        variables.insert(
            "RUBYOPT".to_string(),
            envvar::prepend(ctx.env, "RUBYOPT", AUTO_INSTRUMENT_FLAG),
        );

        info!("Ruby tracer configured");
        Ok(variables)
    }
}
