// Provisioning coordinator: decides whether and what to provision, caches
// the outcome per run, and aggregates per-language contributions

use std::collections::HashMap;

use tracing::{debug, error, info, warn, Instrument};

use crate::config::ProvisioningSettings;
use crate::core::{ProvisioningRequest, ProvisioningResult, RunContext};
use crate::error::Result;
use crate::language::{ProvisionContext, ProvisionerRegistry};
use crate::logging::utils::{language_span, provisioning_span};

/// Variable enabling CI visibility in every provisioned build.
pub const CI_VISIBILITY_ENABLED_VARIABLE: &str = "DD_CIVISIBILITY_ENABLED";
/// Variable carrying the deployment environment reported on spans.
pub const ENVIRONMENT_VARIABLE: &str = "DD_ENV";
/// Variable carrying the service name reported on spans.
pub const SERVICE_VARIABLE: &str = "DD_SERVICE";
/// Environment name stamped on everything provisioned here.
pub const CI_ENVIRONMENT_NAME: &str = "ci";

/// Entry point of the tracer auto-provisioning subsystem.
///
/// One coordinator serves any number of runs; all per-run state lives in
/// the caller-held [`RunContext`].
pub struct ProvisioningCoordinator {
    settings: ProvisioningSettings,
    registry: ProvisionerRegistry,
}

impl ProvisioningCoordinator {
    /// Coordinator over the built-in provisioner registry.
    pub fn new(settings: ProvisioningSettings) -> Result<Self> {
        Ok(Self {
            settings,
            registry: ProvisionerRegistry::with_builtins()?,
        })
    }

    /// Coordinator over a caller-assembled registry.
    pub fn with_registry(settings: ProvisioningSettings, registry: ProvisionerRegistry) -> Self {
        Self { settings, registry }
    }

    pub fn settings(&self) -> &ProvisioningSettings {
        &self.settings
    }

    /// Resolve the environment-variable overrides for one request.
    ///
    /// Never fails the build: any aborting provisioning error is logged and
    /// collapses to an empty map (fail-closed — a half-configured
    /// environment is never injected).
    pub async fn configure(
        &self,
        ctx: &RunContext,
        request: &ProvisioningRequest,
    ) -> HashMap<String, String> {
        if !self.settings.enabled {
            debug!("Tracer provisioning disabled for this job");
            return HashMap::new();
        }

        let span = provisioning_span(ctx.run_id(), &request.node.hostname);
        match self.provision(ctx, request).instrument(span).await {
            Ok(variables) => variables,
            Err(e) => {
                error!(
                    run_id = %ctx.run_id(),
                    node = %request.node.hostname,
                    error = %e,
                    "Tracer provisioning failed, discarding partial environment"
                );
                HashMap::new()
            }
        }
    }

    /// Blocking wrapper for hosts without an async runtime of their own.
    pub fn configure_blocking(
        &self,
        ctx: &RunContext,
        request: &ProvisioningRequest,
    ) -> HashMap<String, String> {
        match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime.block_on(self.configure(ctx, request)),
            Err(e) => {
                error!(error = %e, "Failed to start provisioning runtime");
                HashMap::new()
            }
        }
    }

    async fn provision(
        &self,
        ctx: &RunContext,
        request: &ProvisioningRequest,
    ) -> Result<HashMap<String, String>> {
        if let Some(cached) = ctx.cached_result() {
            if cached.satisfies(request) && self.cached_still_valid(&cached, request).await {
                info!(
                    node = %cached.node_hostname,
                    "Reusing cached tracer environment"
                );
                return Ok(cached.variables);
            }
        }

        let mut variables = self.common_variables();
        let provision_ctx = ProvisionContext {
            settings: &self.settings,
            node: &request.node,
            workspace: &request.workspace,
            env: &request.env,
        };

        for language in &request.languages {
            let Some(provisioner) = self.registry.get(*language) else {
                warn!(language = %language, "Unsupported tracing language, skipping");
                continue;
            };

            let span = language_span(*language);
            match provisioner.configure(&provision_ctx).instrument(span).await {
                Ok(contribution) => {
                    info!(
                        language = %language,
                        variables = contribution.len(),
                        "Language tracer configured"
                    );
                    variables.extend(contribution);
                }
                Err(e) if e.is_skippable() => {
                    warn!(language = %language, reason = %e, "Skipping language");
                }
                Err(e) => return Err(e),
            }
        }

        // User-supplied variables always win, even over provisioner output.
        for (key, value) in &self.settings.additional_variables {
            variables.insert(key.clone(), value.clone());
        }

        ctx.store_result(ProvisioningResult {
            node_hostname: request.node.hostname.clone(),
            languages: request.languages.clone(),
            variables: variables.clone(),
        });

        Ok(variables)
    }

    /// Advisory re-check of previously provisioned artifacts before a
    /// cached result is reused.
    async fn cached_still_valid(
        &self,
        _cached: &ProvisioningResult,
        request: &ProvisioningRequest,
    ) -> bool {
        for language in &request.languages {
            if let Some(provisioner) = self.registry.get(*language) {
                if !provisioner
                    .is_configuration_valid(&request.node, &request.workspace)
                    .await
                {
                    debug!(language = %language, "Cached configuration no longer valid");
                    return false;
                }
            }
        }
        true
    }

    fn common_variables(&self) -> HashMap<String, String> {
        let mut variables = HashMap::new();
        variables.insert(
            CI_VISIBILITY_ENABLED_VARIABLE.to_string(),
            "true".to_string(),
        );
        variables.insert(
            ENVIRONMENT_VARIABLE.to_string(),
            CI_ENVIRONMENT_NAME.to_string(),
        );
        if !self.settings.service_name.is_empty() {
            variables.insert(SERVICE_VARIABLE.to_string(), self.settings.service_name.clone());
        }
        for (key, value) in &self.settings.client_variables {
            variables.insert(key.clone(), value.clone());
        }
        for (key, value) in &self.settings.additional_variables {
            variables.insert(key.clone(), value.clone());
        }
        variables
    }
}
