// Core data structures for tracer provisioning: languages, nodes, requests,
// and the per-run result cache

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

/// Languages with a registered tracer provisioning strategy.
///
/// The set is closed: adding a language means adding a provisioner variant
/// and a registry entry, never touching dispatch logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracedLanguage {
    Java,
    Javascript,
    Python,
    Dotnet,
    Go,
    Ruby,
}

impl TracedLanguage {
    pub fn all() -> [TracedLanguage; 6] {
        [
            TracedLanguage::Java,
            TracedLanguage::Javascript,
            TracedLanguage::Python,
            TracedLanguage::Dotnet,
            TracedLanguage::Go,
            TracedLanguage::Ruby,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TracedLanguage::Java => "java",
            TracedLanguage::Javascript => "javascript",
            TracedLanguage::Python => "python",
            TracedLanguage::Dotnet => "dotnet",
            TracedLanguage::Go => "go",
            TracedLanguage::Ruby => "ruby",
        }
    }
}

impl fmt::Display for TracedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TracedLanguage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "java" => Ok(TracedLanguage::Java),
            "javascript" | "js" | "nodejs" => Ok(TracedLanguage::Javascript),
            "python" => Ok(TracedLanguage::Python),
            "dotnet" | ".net" => Ok(TracedLanguage::Dotnet),
            "go" | "golang" => Ok(TracedLanguage::Go),
            "ruby" => Ok(TracedLanguage::Ruby),
            other => Err(format!("unknown traced language: {other}")),
        }
    }
}

/// Identity of the (possibly remote) machine a build's steps execute on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub hostname: String,
    /// True when the build executes on the central/controller node, which
    /// is the only place host proxy settings apply to outbound agent
    /// traffic.
    pub controller: bool,
}

impl NodeInfo {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            controller: false,
        }
    }

    pub fn controller(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            controller: true,
        }
    }
}

/// One provisioning request, created when the host first needs the tracing
/// environment for a run on a particular node.
#[derive(Debug, Clone)]
pub struct ProvisioningRequest {
    pub node: NodeInfo,
    pub languages: BTreeSet<TracedLanguage>,
    /// Absolute path of the build workspace on the execution node.
    pub workspace: PathBuf,
    /// The build's current environment, used for flag composition and
    /// never mutated.
    pub env: HashMap<String, String>,
}

impl ProvisioningRequest {
    pub fn new(
        node: NodeInfo,
        languages: impl IntoIterator<Item = TracedLanguage>,
        workspace: impl Into<PathBuf>,
        env: HashMap<String, String>,
    ) -> Self {
        Self {
            node,
            languages: languages.into_iter().collect(),
            workspace: workspace.into(),
            env,
        }
    }
}

/// Aggregate outcome of provisioning one (node, language set) pair.
///
/// Immutable once built; attached to the run through [`RunContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningResult {
    pub node_hostname: String,
    pub languages: BTreeSet<TracedLanguage>,
    pub variables: HashMap<String, String>,
}

impl ProvisioningResult {
    /// A cached result satisfies a request iff it was produced on the same
    /// node and its language set covers the requested one.
    pub fn satisfies(&self, request: &ProvisioningRequest) -> bool {
        self.node_hostname == request.node.hostname
            && request.languages.is_subset(&self.languages)
    }
}

/// Per-run handle the caller creates once and passes by reference into the
/// coordinator across repeated calls within one run.
///
/// The cached result is written at most once per distinct (node, covering
/// language set) and only read afterwards; the mutex is nothing more than
/// the attachment mechanism.
#[derive(Debug)]
pub struct RunContext {
    run_id: String,
    cache: Mutex<Option<ProvisioningResult>>,
}

impl RunContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            cache: Mutex::new(None),
        }
    }

    /// Context with a generated run identifier, for hosts that do not carry
    /// their own.
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn cached_result(&self) -> Option<ProvisioningResult> {
        self.cache.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn store_result(&self, result: ProvisioningResult) {
        if let Ok(mut guard) = self.cache.lock() {
            *guard = Some(result);
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::generate()
    }
}
