// Python tracer provisioning
//
// Installs or upgrades ddtrace through pip, resolves its installed
// location from `pip show`, and wires pytest plus the module search path.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;

use crate::core::TracedLanguage;
use crate::envvar;
use crate::error::{CommandError, Result, ToolchainError};

use super::traits::{LanguageProvisioner, ProvisionContext};

const TRACER_PACKAGE: &str = "ddtrace";

#[derive(Debug, Default)]
pub struct PythonProvisioner;

impl PythonProvisioner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageProvisioner for PythonProvisioner {
    fn language(&self) -> TracedLanguage {
        TracedLanguage::Python
    }

    async fn configure(&self, ctx: &ProvisionContext<'_>) -> Result<HashMap<String, String>> {
        if which::which("pip").is_err() {
            return Err(ToolchainError::NotFound {
                tool: "pip".to_string(),
                language: TracedLanguage::Python,
            }
            .into());
        }

        let executor = ctx.executor();
        executor
            .execute(|_| Ok(()), &["pip", "install", "-U", TRACER_PACKAGE])
            .await?;

        let location = executor
            .execute(parse_location, &["pip", "show", TRACER_PACKAGE])
            .await?;

        let mut variables = HashMap::new();
        variables.insert(
            "PYTEST_ADDOPTS".to_string(),
            envvar::append(ctx.env, "PYTEST_ADDOPTS", "--ddtrace"),
        );
        variables.insert(
            "PYTHONPATH".to_string(),
            envvar::prepend_path(ctx.env, "PYTHONPATH", &location),
        );

        info!(location = %location, "Python tracer configured");
        Ok(variables)
    }
}

/// Extract the path after the `Location:` label from `pip show` output.
fn parse_location(output: &str) -> Result<String> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("Location:"))
        .map(|rest| rest.trim().to_string())
        .filter(|location| !location.is_empty())
        .ok_or_else(|| {
            CommandError::UnexpectedOutput {
                command: format!("pip show {TRACER_PACKAGE}"),
                message: "no Location: line in package metadata".to_string(),
                output: output.to_string(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location_line() {
        let output = "Name: ddtrace\nVersion: 2.9.0\nLocation: /usr/lib/python3.11/site-packages\nRequires: bytecode\n";
        assert_eq!(
            parse_location(output).unwrap(),
            "/usr/lib/python3.11/site-packages"
        );
    }

    #[test]
    fn test_missing_location_is_an_error() {
        let result = parse_location("Name: ddtrace\nVersion: 2.9.0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_location_is_an_error() {
        assert!(parse_location("Location:\n").is_err());
    }
}
