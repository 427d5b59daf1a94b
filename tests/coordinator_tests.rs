// Coordinator behavior tests: caching, skip semantics and the fail-closed
// aggregate contract

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ddprov::{
    CommandError, LanguageProvisioner, NodeInfo, ProvisionContext, ProvisionerRegistry,
    ProvisioningCoordinator, ProvisioningRequest, ProvisioningSettings, Result, RunContext,
    ToolchainError, TracedLanguage,
};

/// Provisioner returning fixed variables and counting its invocations.
struct CountingProvisioner {
    language: TracedLanguage,
    variables: HashMap<String, String>,
    calls: Arc<AtomicUsize>,
}

impl CountingProvisioner {
    fn new(language: TracedLanguage, pairs: &[(&str, &str)]) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provisioner = Self {
            language,
            variables: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            calls: calls.clone(),
        };
        (provisioner, calls)
    }
}

#[async_trait]
impl LanguageProvisioner for CountingProvisioner {
    fn language(&self) -> TracedLanguage {
        self.language
    }

    async fn configure(&self, _ctx: &ProvisionContext<'_>) -> Result<HashMap<String, String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.variables.clone())
    }
}

/// Provisioner that always fails, either skippably or fatally.
struct FailingProvisioner {
    language: TracedLanguage,
    skippable: bool,
}

#[async_trait]
impl LanguageProvisioner for FailingProvisioner {
    fn language(&self) -> TracedLanguage {
        self.language
    }

    async fn configure(&self, _ctx: &ProvisionContext<'_>) -> Result<HashMap<String, String>> {
        if self.skippable {
            Err(ToolchainError::NotFound {
                tool: "npm".to_string(),
                language: self.language,
            }
            .into())
        } else {
            Err(CommandError::ExecutionFailed {
                command: "npm install".to_string(),
                exit_code: Some(1),
                stderr: "network unreachable".to_string(),
            }
            .into())
        }
    }
}

fn request(hostname: &str, languages: &[TracedLanguage], workspace: &Path) -> ProvisioningRequest {
    ProvisioningRequest::new(
        NodeInfo::new(hostname),
        languages.iter().copied(),
        workspace,
        HashMap::new(),
    )
}

#[tokio::test]
async fn test_disabled_provisioning_returns_empty() {
    let workspace = tempfile::TempDir::new().unwrap();
    let (java, calls) = CountingProvisioner::new(TracedLanguage::Java, &[("A", "1")]);
    let mut registry = ProvisionerRegistry::empty();
    registry.register(Arc::new(java));

    let coordinator =
        ProvisioningCoordinator::with_registry(ProvisioningSettings::disabled(), registry);
    let ctx = RunContext::generate();
    let variables = coordinator
        .configure(&ctx, &request("agent-1", &[TracedLanguage::Java], workspace.path()))
        .await;

    assert!(variables.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(ctx.cached_result().is_none());
}

#[tokio::test]
async fn test_cache_hit_skips_reprovisioning() {
    let workspace = tempfile::TempDir::new().unwrap();
    let (java, java_calls) =
        CountingProvisioner::new(TracedLanguage::Java, &[("MAVEN_OPTS", "-javaagent:x")]);
    let (python, _) = CountingProvisioner::new(TracedLanguage::Python, &[("PYTHONPATH", "/p")]);
    let mut registry = ProvisionerRegistry::empty();
    registry.register(Arc::new(java));
    registry.register(Arc::new(python));

    let coordinator =
        ProvisioningCoordinator::with_registry(ProvisioningSettings::default(), registry);
    let ctx = RunContext::generate();

    let both = request(
        "agent-1",
        &[TracedLanguage::Java, TracedLanguage::Python],
        workspace.path(),
    );
    let first = coordinator.configure(&ctx, &both).await;
    assert_eq!(java_calls.load(Ordering::SeqCst), 1);

    // Identical request: content-identical variables, no new invocations.
    let second = coordinator.configure(&ctx, &both).await;
    assert_eq!(first, second);
    assert_eq!(java_calls.load(Ordering::SeqCst), 1);

    // Subset of the cached language set is still a hit.
    let subset = request("agent-1", &[TracedLanguage::Java], workspace.path());
    let third = coordinator.configure(&ctx, &subset).await;
    assert_eq!(first, third);
    assert_eq!(java_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_no_cross_node_cache_reuse() {
    let workspace = tempfile::TempDir::new().unwrap();
    let (java, calls) = CountingProvisioner::new(TracedLanguage::Java, &[("A", "1")]);
    let mut registry = ProvisionerRegistry::empty();
    registry.register(Arc::new(java));

    let coordinator =
        ProvisioningCoordinator::with_registry(ProvisioningSettings::default(), registry);
    let ctx = RunContext::generate();

    coordinator
        .configure(&ctx, &request("agent-1", &[TracedLanguage::Java], workspace.path()))
        .await;
    coordinator
        .configure(&ctx, &request("agent-2", &[TracedLanguage::Java], workspace.path()))
        .await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_superset_request_reprovisions() {
    let workspace = tempfile::TempDir::new().unwrap();
    let (java, java_calls) = CountingProvisioner::new(TracedLanguage::Java, &[("A", "1")]);
    let (ruby, ruby_calls) = CountingProvisioner::new(TracedLanguage::Ruby, &[("B", "2")]);
    let mut registry = ProvisionerRegistry::empty();
    registry.register(Arc::new(java));
    registry.register(Arc::new(ruby));

    let coordinator =
        ProvisioningCoordinator::with_registry(ProvisioningSettings::default(), registry);
    let ctx = RunContext::generate();

    coordinator
        .configure(&ctx, &request("agent-1", &[TracedLanguage::Java], workspace.path()))
        .await;
    let expanded = coordinator
        .configure(
            &ctx,
            &request(
                "agent-1",
                &[TracedLanguage::Java, TracedLanguage::Ruby],
                workspace.path(),
            ),
        )
        .await;

    assert_eq!(java_calls.load(Ordering::SeqCst), 2);
    assert_eq!(ruby_calls.load(Ordering::SeqCst), 1);
    assert_eq!(expanded.get("B").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn test_unregistered_language_is_skipped_softly() {
    let workspace = tempfile::TempDir::new().unwrap();
    let (java, _) = CountingProvisioner::new(TracedLanguage::Java, &[("A", "1")]);
    let mut registry = ProvisionerRegistry::empty();
    registry.register(Arc::new(java));

    let coordinator =
        ProvisioningCoordinator::with_registry(ProvisioningSettings::default(), registry);
    let ctx = RunContext::generate();
    let variables = coordinator
        .configure(
            &ctx,
            &request(
                "agent-1",
                &[TracedLanguage::Java, TracedLanguage::Dotnet],
                workspace.path(),
            ),
        )
        .await;

    assert_eq!(variables.get("A").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn test_toolchain_failure_skips_language_but_keeps_others() {
    let workspace = tempfile::TempDir::new().unwrap();
    let (java, _) = CountingProvisioner::new(TracedLanguage::Java, &[("A", "1")]);
    let mut registry = ProvisionerRegistry::empty();
    registry.register(Arc::new(java));
    registry.register(Arc::new(FailingProvisioner {
        language: TracedLanguage::Javascript,
        skippable: true,
    }));

    let coordinator =
        ProvisioningCoordinator::with_registry(ProvisioningSettings::default(), registry);
    let ctx = RunContext::generate();
    let variables = coordinator
        .configure(
            &ctx,
            &request(
                "agent-1",
                &[TracedLanguage::Java, TracedLanguage::Javascript],
                workspace.path(),
            ),
        )
        .await;

    assert_eq!(variables.get("A").map(String::as_str), Some("1"));
    assert_eq!(
        variables
            .get(ddprov::CI_VISIBILITY_ENABLED_VARIABLE)
            .map(String::as_str),
        Some("true")
    );
}

#[tokio::test]
async fn test_installation_failure_fails_closed() {
    let workspace = tempfile::TempDir::new().unwrap();
    let (java, _) = CountingProvisioner::new(TracedLanguage::Java, &[("A", "1")]);
    let mut registry = ProvisionerRegistry::empty();
    registry.register(Arc::new(java));
    registry.register(Arc::new(FailingProvisioner {
        language: TracedLanguage::Ruby,
        skippable: false,
    }));

    let coordinator =
        ProvisioningCoordinator::with_registry(ProvisioningSettings::default(), registry);
    let ctx = RunContext::generate();
    let variables = coordinator
        .configure(
            &ctx,
            &request(
                "agent-1",
                &[TracedLanguage::Java, TracedLanguage::Ruby],
                workspace.path(),
            ),
        )
        .await;

    // Partial environment injection is never allowed.
    assert!(variables.is_empty());
    assert!(ctx.cached_result().is_none());
}

#[tokio::test]
async fn test_common_variables_and_extra_precedence() {
    let workspace = tempfile::TempDir::new().unwrap();
    let (java, _) = CountingProvisioner::new(TracedLanguage::Java, &[("DD_TAGS", "from-java")]);
    let mut registry = ProvisionerRegistry::empty();
    registry.register(Arc::new(java));

    let mut settings = ProvisioningSettings::default().with_service_name("billing");
    settings
        .client_variables
        .insert("DD_AGENT_HOST".to_string(), "agent.internal".to_string());
    settings
        .additional_variables
        .insert("DD_TAGS".to_string(), "team:ci".to_string());

    let coordinator = ProvisioningCoordinator::with_registry(settings, registry);
    let ctx = RunContext::generate();
    let variables = coordinator
        .configure(&ctx, &request("agent-1", &[TracedLanguage::Java], workspace.path()))
        .await;

    assert_eq!(
        variables
            .get(ddprov::CI_VISIBILITY_ENABLED_VARIABLE)
            .map(String::as_str),
        Some("true")
    );
    assert_eq!(
        variables.get(ddprov::ENVIRONMENT_VARIABLE).map(String::as_str),
        Some("ci")
    );
    assert_eq!(
        variables.get(ddprov::SERVICE_VARIABLE).map(String::as_str),
        Some("billing")
    );
    assert_eq!(
        variables.get("DD_AGENT_HOST").map(String::as_str),
        Some("agent.internal")
    );
    // User-supplied extras win over provisioner output.
    assert_eq!(variables.get("DD_TAGS").map(String::as_str), Some("team:ci"));
}
