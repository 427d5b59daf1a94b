// ddprov - Library module
// Auto-provisions language-specific tracing agents onto a CI build
// execution's node so the build's own tools emit spans, without the user
// installing or configuring anything.

pub mod config;
pub mod coordinator;
pub mod core;
pub mod download;
pub mod envvar;
pub mod error;
pub mod language;
pub mod logging;
pub mod process;
pub mod signature;
pub mod version;

// Re-export main types for easier access
pub use config::{
    JavaSettings, ProvisioningSettings, ProxySettings, DEFAULT_COMMAND_TIMEOUT,
    DEFAULT_JAVA_AGENT_TTL, DEFAULT_JAVA_AGENT_URL,
};
pub use coordinator::{
    ProvisioningCoordinator, CI_ENVIRONMENT_NAME, CI_VISIBILITY_ENABLED_VARIABLE,
    ENVIRONMENT_VARIABLE, SERVICE_VARIABLE,
};
pub use core::{
    NodeInfo, ProvisioningRequest, ProvisioningResult, RunContext, TracedLanguage,
};
pub use download::{Downloader, HttpDownloader};
pub use error::{
    CommandError, DownloadError, ProvisionError, Result, SignatureError, ToolchainError,
};
pub use language::{
    DotnetProvisioner, GolangProvisioner, JavaProvisioner, LanguageProvisioner,
    NodejsProvisioner, ProvisionContext, ProvisionerRegistry, PythonProvisioner,
    RubyProvisioner, TRACER_HOME_DIR,
};
pub use logging::{ColorConfig, LogConfig, LogFormat};
pub use process::CommandExecutor;
pub use signature::SignatureVerifier;
pub use version::{DottedVersion, SemanticVersion};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
