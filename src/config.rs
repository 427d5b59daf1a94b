// Provisioning configuration supplied by the host when the coordinator is
// constructed

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Default bound on any single external command run during provisioning.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Trusted first-party redirect for the Java agent artifact. Downloads from
/// this URL skip detached-signature verification.
pub const DEFAULT_JAVA_AGENT_URL: &str = "https://dtdg.co/latest-java-tracer";

/// How long a downloaded Java agent jar stays usable before it is
/// re-fetched.
pub const DEFAULT_JAVA_AGENT_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Top-level provisioning settings for one job.
///
/// The host resolves its own client configuration (site/API key, or agent
/// host and ports) down to `client_variables` before calling in; this crate
/// never reads global client-config storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningSettings {
    /// Master switch; when false the coordinator returns an empty map.
    pub enabled: bool,
    /// Service name reported on emitted spans (`DD_SERVICE`).
    pub service_name: String,
    /// Client-derived variables, already reduced to a map by the host
    /// (e.g. `DD_SITE`/`DD_API_KEY` or `DD_AGENT_HOST`/`DD_TRACE_AGENT_PORT`).
    pub client_variables: HashMap<String, String>,
    /// Arbitrary user-supplied variables, merged with highest precedence.
    pub additional_variables: HashMap<String, String>,
    /// Outbound proxy of the host, applied to Java agent traffic when the
    /// build runs on the controller node.
    pub proxy: Option<ProxySettings>,
    /// Bound on each external command run by the provisioners.
    pub command_timeout: Duration,
    pub java: JavaSettings,
}

impl Default for ProvisioningSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: String::new(),
            client_variables: HashMap::new(),
            additional_variables: HashMap::new(),
            proxy: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            java: JavaSettings::default(),
        }
    }
}

impl ProvisioningSettings {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }
}

/// Java agent distribution and caching knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JavaSettings {
    /// Where the agent jar is fetched from. Anything other than the default
    /// redirect additionally requires a valid detached signature.
    pub distribution_url: Url,
    /// TTL of the cached jar under the workspace `.datadog` directory.
    pub cache_ttl: Duration,
}

impl Default for JavaSettings {
    fn default() -> Self {
        Self {
            // The constant is a valid URL; parsing it cannot fail.
            distribution_url: Url::parse(DEFAULT_JAVA_AGENT_URL)
                .unwrap_or_else(|_| unreachable!("default agent URL is well-formed")),
            cache_ttl: DEFAULT_JAVA_AGENT_TTL,
        }
    }
}

impl JavaSettings {
    /// Whether the configured distribution URL is the trusted first-party
    /// default.
    pub fn uses_default_distribution(&self) -> bool {
        self.distribution_url.as_str() == DEFAULT_JAVA_AGENT_URL
    }
}

/// Host outbound proxy, reduced to what the Java agent flags need
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    pub non_proxy_hosts: Vec<String>,
}

impl ProxySettings {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            non_proxy_hosts: Vec::new(),
        }
    }

    /// JVM system-property flags for this proxy, in the order the agent
    /// expects them.
    pub fn jvm_flags(&self) -> Vec<String> {
        let mut flags = vec![
            format!("-Dhttp.proxyHost={}", self.host),
            format!("-Dhttp.proxyPort={}", self.port),
            format!("-Dhttps.proxyHost={}", self.host),
            format!("-Dhttps.proxyPort={}", self.port),
        ];
        if !self.non_proxy_hosts.is_empty() {
            flags.push(format!(
                "-Dhttp.nonProxyHosts={}",
                self.non_proxy_hosts.join("|")
            ));
        }
        flags
    }
}
