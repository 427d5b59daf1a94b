// Provisioner registration and lookup
//
// The registry is built once before the first provisioning call and never
// mutated afterwards; adding a language means adding a provisioner and a
// registry entry, not touching dispatch logic.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::TracedLanguage;
use crate::error::Result;

use super::traits::LanguageProvisioner;
use super::{
    DotnetProvisioner, GolangProvisioner, JavaProvisioner, NodejsProvisioner, PythonProvisioner,
    RubyProvisioner,
};

/// Immutable map from language to provisioning strategy
pub struct ProvisionerRegistry {
    provisioners: HashMap<TracedLanguage, Arc<dyn LanguageProvisioner>>,
}

impl ProvisionerRegistry {
    pub fn empty() -> Self {
        Self {
            provisioners: HashMap::new(),
        }
    }

    /// Registry with every built-in provisioner registered. The Go entry
    /// is the version-gated strategy.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::empty();
        registry.register(Arc::new(JavaProvisioner::new()?));
        registry.register(Arc::new(NodejsProvisioner::new()));
        registry.register(Arc::new(PythonProvisioner::new()));
        registry.register(Arc::new(DotnetProvisioner::new()));
        registry.register(Arc::new(GolangProvisioner::version_gated()));
        registry.register(Arc::new(RubyProvisioner::new()));
        Ok(registry)
    }

    /// Register a provisioner under its own language key. Intended for
    /// registry construction only; the coordinator holds the registry
    /// immutably.
    pub fn register(&mut self, provisioner: Arc<dyn LanguageProvisioner>) {
        self.provisioners.insert(provisioner.language(), provisioner);
    }

    pub fn get(&self, language: TracedLanguage) -> Option<Arc<dyn LanguageProvisioner>> {
        self.provisioners.get(&language).cloned()
    }

    pub fn languages(&self) -> Vec<TracedLanguage> {
        let mut languages: Vec<_> = self.provisioners.keys().copied().collect();
        languages.sort();
        languages
    }

    pub fn len(&self) -> usize {
        self.provisioners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.provisioners.is_empty()
    }
}
