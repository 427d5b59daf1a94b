// Java tracer provisioning
//
// Maintains a TTL'd agent jar under the workspace tracer home, verifies
// non-default distributions against the embedded trust anchor, and splices
// the -javaagent flag into each JVM build tool's options variable.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};
use url::Url;

use crate::config::DEFAULT_JAVA_AGENT_TTL;
use crate::core::{NodeInfo, TracedLanguage};
use crate::download::{Downloader, HttpDownloader};
use crate::envvar;
use crate::error::{Result, SignatureError};
use crate::signature::SignatureVerifier;

use super::traits::{LanguageProvisioner, ProvisionContext};
use super::tracer_home;

/// File name of the cached agent artifact inside the tracer home.
pub const AGENT_JAR_NAME: &str = "dd-java-agent.jar";

/// Setting this variable in the build environment suppresses proxy flag
/// composition on the controller node.
pub const IGNORE_PROXY_VARIABLE: &str = "DD_TRACER_IGNORE_PROXY";

/// Options variables of the JVM build tools the agent flag is injected
/// into.
const TOOL_OPTIONS_VARIABLES: [&str; 3] = ["MAVEN_OPTS", "GRADLE_OPTS", "ANT_OPTS"];

pub struct JavaProvisioner {
    downloader: Arc<dyn Downloader>,
    verifier: SignatureVerifier,
}

impl JavaProvisioner {
    pub fn new() -> Result<Self> {
        Ok(Self::with_downloader(Arc::new(HttpDownloader::new()?)))
    }

    /// Provisioner over a caller-supplied downloader, used by tests to
    /// count or fake network calls.
    pub fn with_downloader(downloader: Arc<dyn Downloader>) -> Self {
        Self {
            downloader,
            verifier: SignatureVerifier::embedded(),
        }
    }

    pub fn with_verifier(mut self, verifier: SignatureVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Return the cached jar when it is younger than the TTL; otherwise
    /// download it, verifying the signature for non-default distributions.
    async fn ensure_agent_jar(&self, ctx: &ProvisionContext<'_>) -> Result<PathBuf> {
        let home = tracer_home(ctx.workspace)?;
        let jar = home.join(AGENT_JAR_NAME);

        if is_fresh(&jar, ctx.settings.java.cache_ttl) {
            debug!(jar = %jar.display(), "Reusing cached Java agent");
            return Ok(jar);
        }

        let url = &ctx.settings.java.distribution_url;
        self.downloader.download(url, &jar).await?;

        if !ctx.settings.java.uses_default_distribution() {
            let signature = self.downloader.fetch(&signature_url(url)?).await?;
            let content = tokio::fs::read(&jar).await?;
            self.verifier.verify(&jar, &content, &signature)?;
            info!(url = %url, "Java agent signature verified");
        }

        Ok(jar)
    }
}

#[async_trait]
impl LanguageProvisioner for JavaProvisioner {
    fn language(&self) -> TracedLanguage {
        TracedLanguage::Java
    }

    async fn configure(&self, ctx: &ProvisionContext<'_>) -> Result<HashMap<String, String>> {
        let jar = self.ensure_agent_jar(ctx).await?;
        let agent_flag = format!("-javaagent:{}", jar.display());

        let mut variables = HashMap::new();
        for key in TOOL_OPTIONS_VARIABLES {
            variables.insert(key.to_string(), envvar::prepend(ctx.env, key, &agent_flag));
        }

        // Proxy flags are derived from the host proxy settings and the
        // caller-supplied base environment only, never from the partially
        // built result map.
        if ctx.node.controller && !proxy_suppressed(ctx.env) {
            if let Some(proxy) = &ctx.settings.proxy {
                let flags = proxy.jvm_flags().join(" ");
                for key in TOOL_OPTIONS_VARIABLES {
                    if let Some(value) = variables.get_mut(key) {
                        value.push(' ');
                        value.push_str(&flags);
                    }
                }
                debug!(proxy = %proxy.host, "Appended outbound proxy flags to JVM options");
            }
        }

        // User-supplied variables win over everything composed above.
        for (key, value) in &ctx.settings.additional_variables {
            variables.insert(key.clone(), value.clone());
        }

        info!(jar = %jar.display(), "Java tracer configured");
        Ok(variables)
    }

    async fn is_configuration_valid(&self, _node: &NodeInfo, workspace: &Path) -> bool {
        let jar = workspace.join(super::TRACER_HOME_DIR).join(AGENT_JAR_NAME);
        is_fresh(&jar, DEFAULT_JAVA_AGENT_TTL)
    }
}

fn signature_url(url: &Url) -> Result<Url> {
    Url::parse(&format!("{url}.sig")).map_err(|e| {
        SignatureError::Malformed {
            message: format!("cannot derive signature URL from {url}: {e}"),
        }
        .into()
    })
}

fn proxy_suppressed(env: &HashMap<String, String>) -> bool {
    env.get(IGNORE_PROXY_VARIABLE)
        .map(|value| {
            let value = value.trim();
            value.eq_ignore_ascii_case("true") || value == "1"
        })
        .unwrap_or(false)
}

fn is_fresh(path: &Path, ttl: Duration) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    // A modification time in the future counts as fresh.
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age < ttl)
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_jar_is_stale() {
        assert!(!is_fresh(
            Path::new("/nonexistent/dd-java-agent.jar"),
            Duration::from_secs(60)
        ));
    }

    #[test]
    fn test_recent_jar_is_fresh_and_aged_jar_is_stale() {
        let dir = tempfile::TempDir::new().unwrap();
        let jar = dir.path().join(AGENT_JAR_NAME);
        std::fs::write(&jar, b"jar").unwrap();
        assert!(is_fresh(&jar, Duration::from_secs(3600)));

        let stale = filetime::FileTime::from_system_time(
            SystemTime::now() - Duration::from_secs(2 * 3600),
        );
        filetime::set_file_mtime(&jar, stale).unwrap();
        assert!(!is_fresh(&jar, Duration::from_secs(3600)));
    }

    #[test]
    fn test_proxy_suppression_values() {
        let mut env = HashMap::new();
        assert!(!proxy_suppressed(&env));

        env.insert(IGNORE_PROXY_VARIABLE.to_string(), "true".to_string());
        assert!(proxy_suppressed(&env));

        env.insert(IGNORE_PROXY_VARIABLE.to_string(), "1".to_string());
        assert!(proxy_suppressed(&env));

        env.insert(IGNORE_PROXY_VARIABLE.to_string(), "false".to_string());
        assert!(!proxy_suppressed(&env));
    }

    #[test]
    fn test_signature_url_appends_suffix() {
        let url = Url::parse("https://mirror.example.com/agent.jar").unwrap();
        assert_eq!(
            signature_url(&url).unwrap().as_str(),
            "https://mirror.example.com/agent.jar.sig"
        );
    }
}
