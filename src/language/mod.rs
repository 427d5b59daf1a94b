// Language provisioner strategy architecture
// One provisioner per traced language, selected through an immutable
// registry keyed by the closed TracedLanguage enumeration

use std::path::{Path, PathBuf};

use crate::error::{ProvisionError, Result};

pub mod dotnet;
pub mod golang;
pub mod java;
pub mod nodejs;
pub mod python;
pub mod registry;
pub mod ruby;
pub mod traits;

// Re-export main types for easier access
pub use dotnet::DotnetProvisioner;
pub use golang::GolangProvisioner;
pub use java::JavaProvisioner;
pub use nodejs::NodejsProvisioner;
pub use python::PythonProvisioner;
pub use registry::ProvisionerRegistry;
pub use ruby::RubyProvisioner;
pub use traits::{LanguageProvisioner, ProvisionContext};

/// Hidden directory inside the workspace used as the artifact cache and
/// isolated install prefix.
pub const TRACER_HOME_DIR: &str = ".datadog";

/// Resolve (and create if needed) the workspace-local tracer home.
pub(crate) fn tracer_home(workspace: &Path) -> Result<PathBuf> {
    if !workspace.is_dir() {
        return Err(ProvisionError::Workspace {
            path: workspace.to_path_buf(),
            message: "workspace directory does not exist".to_string(),
        });
    }
    let home = workspace.join(TRACER_HOME_DIR);
    std::fs::create_dir_all(&home).map_err(|e| ProvisionError::Workspace {
        path: home.clone(),
        message: e.to_string(),
    })?;
    Ok(home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracer_home_is_created_inside_workspace() {
        let workspace = tempfile::TempDir::new().unwrap();
        let home = tracer_home(workspace.path()).unwrap();
        assert!(home.is_dir());
        assert!(home.ends_with(TRACER_HOME_DIR));
    }

    #[test]
    fn test_missing_workspace_is_an_error() {
        let result = tracer_home(Path::new("/nonexistent/workspace"));
        assert!(matches!(result, Err(ProvisionError::Workspace { .. })));
    }
}
