//! Capability registry: namespace discovery and identity-cached resolution
//!
//! Runtime namespace scanning abstracts to an explicit registration table
//! built at process start by the composition root. Each named provider
//! declares the one interface it implements through its factory's
//! [`ProviderInstance`], so interface conformance is checked at construction
//! and an ambiguous "first matching type wins" situation cannot arise.

use crate::errors::RegistryError;
use crate::fallback::FallbackHandle;
use parking_lot::RwLock;
use sightline_core_types::{ElementSource, ImageDetector, TextDetector};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A constructed backend instance, tagged with the interface it implements.
#[derive(Clone)]
pub enum ProviderInstance {
    ElementSource(Arc<dyn ElementSource>),
    TextDetector(Arc<dyn TextDetector>),
    ImageDetector(Arc<dyn ImageDetector>),
}

impl ProviderInstance {
    /// Name of the implemented interface, for diagnostics.
    pub fn interface(&self) -> &'static str {
        match self {
            ProviderInstance::ElementSource(_) => "ElementSource",
            ProviderInstance::TextDetector(_) => "TextDetector",
            ProviderInstance::ImageDetector(_) => "ImageDetector",
        }
    }
}

/// Factory for a named provider.
///
/// `build` may perform I/O (opening a device connection, loading a model);
/// discovery never does.
pub trait ProviderFactory: Send + Sync {
    fn build(&self) -> Result<ProviderInstance, RegistryError>;
}

impl<F> ProviderFactory for F
where
    F: Fn() -> Result<ProviderInstance, RegistryError> + Send + Sync,
{
    fn build(&self) -> Result<ProviderInstance, RegistryError> {
        self()
    }
}

/// Locator for one discovered capability: name plus the factory that can
/// instantiate it. Built once at discovery, immutable afterward.
#[derive(Clone)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub namespace: String,
    factory: Arc<dyn ProviderFactory>,
}

/// Registration table: namespace -> ordered (name, factory) entries.
#[derive(Default, Clone)]
pub struct ProviderTable {
    namespaces: HashMap<String, Vec<(String, Arc<dyn ProviderFactory>)>>,
}

impl ProviderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under a namespace. Later registrations of the
    /// same name within a namespace shadow earlier ones at discovery time.
    pub fn register(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        factory: Arc<dyn ProviderFactory>,
    ) -> Self {
        self.namespaces
            .entry(namespace.into())
            .or_default()
            .push((name.into(), factory));
        self
    }

    fn namespace(&self, namespace: &str) -> Option<&[(String, Arc<dyn ProviderFactory>)]> {
        self.namespaces.get(namespace).map(|v| v.as_slice())
    }
}

/// Discovers named capability providers and lazily instantiates them,
/// caching instances by identity.
pub struct CapabilityRegistry {
    table: ProviderTable,
    descriptors: RwLock<HashMap<String, CapabilityDescriptor>>,
    instances: RwLock<HashMap<String, ProviderInstance>>,
}

impl CapabilityRegistry {
    pub fn new(table: ProviderTable) -> Self {
        Self {
            table,
            descriptors: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Record every provider registered under `namespace` in the descriptor
    /// map. Idempotent; a re-scan overwrites duplicate names.
    pub fn discover(&self, namespace: &str) -> Result<(), RegistryError> {
        let entries = self
            .table
            .namespace(namespace)
            .ok_or_else(|| RegistryError::Discovery(namespace.to_string()))?;

        let mut descriptors = self.descriptors.write();
        for (name, factory) in entries {
            debug!(namespace, name = name.as_str(), "discovered capability");
            descriptors.insert(
                name.clone(),
                CapabilityDescriptor {
                    name: name.clone(),
                    namespace: namespace.to_string(),
                    factory: Arc::clone(factory),
                },
            );
        }
        info!(namespace, count = entries.len(), "namespace discovered");
        Ok(())
    }

    /// Descriptor lookup, for diagnostics.
    pub fn descriptor(&self, name: &str) -> Option<CapabilityDescriptor> {
        self.descriptors.read().get(name).cloned()
    }

    /// Drop cached instances; the descriptor map is kept.
    pub fn clear_cache(&self) {
        self.instances.write().clear();
    }

    /// Resolve a provider instance, building and caching it on first use.
    fn resolve_instance(&self, name: &str) -> Result<ProviderInstance, RegistryError> {
        if let Some(instance) = self.instances.read().get(name) {
            return Ok(instance.clone());
        }

        let descriptor = self
            .descriptors
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownCapability(name.to_string()))?;

        debug!(name, namespace = descriptor.namespace.as_str(), "building provider");
        let instance = descriptor.factory.build()?;

        // A concurrent resolve may have built the same provider; keep the
        // first cached instance so repeat calls return the identical Arc.
        let mut instances = self.instances.write();
        let cached = instances
            .entry(name.to_string())
            .or_insert(instance)
            .clone();
        Ok(cached)
    }

    /// Resolve a named element source. Fails with `ImplementationNotFound`
    /// when the provider implements a different interface.
    pub fn resolve_element_source(&self, name: &str) -> Result<Arc<dyn ElementSource>, RegistryError> {
        match self.resolve_instance(name)? {
            ProviderInstance::ElementSource(source) => Ok(source),
            other => Err(RegistryError::ImplementationNotFound {
                name: name.to_string(),
                interface: format!("ElementSource (provider implements {})", other.interface()),
            }),
        }
    }

    /// Resolve a named text detector.
    pub fn resolve_text_detector(&self, name: &str) -> Result<Arc<dyn TextDetector>, RegistryError> {
        match self.resolve_instance(name)? {
            ProviderInstance::TextDetector(detector) => Ok(detector),
            other => Err(RegistryError::ImplementationNotFound {
                name: name.to_string(),
                interface: format!("TextDetector (provider implements {})", other.interface()),
            }),
        }
    }

    /// Resolve a named image detector.
    pub fn resolve_image_detector(&self, name: &str) -> Result<Arc<dyn ImageDetector>, RegistryError> {
        match self.resolve_instance(name)? {
            ProviderInstance::ImageDetector(detector) => Ok(detector),
            other => Err(RegistryError::ImplementationNotFound {
                name: name.to_string(),
                interface: format!("ImageDetector (provider implements {})", other.interface()),
            }),
        }
    }

    /// Resolve an ordered list of element sources into one fallback chain.
    /// Wiring errors propagate; they are never folded into an empty chain.
    pub fn fallback_element_sources(
        &self,
        names: &[String],
    ) -> Result<FallbackHandle<dyn ElementSource>, RegistryError> {
        let mut members = Vec::with_capacity(names.len());
        for name in names {
            members.push(self.resolve_element_source(name)?);
        }
        Ok(FallbackHandle::new(members))
    }

    /// Resolve an ordered list of text detectors into one fallback chain.
    pub fn fallback_text_detectors(
        &self,
        names: &[String],
    ) -> Result<FallbackHandle<dyn TextDetector>, RegistryError> {
        let mut members = Vec::with_capacity(names.len());
        for name in names {
            members.push(self.resolve_text_detector(name)?);
        }
        Ok(FallbackHandle::new(members))
    }

    /// Resolve an ordered list of image detectors into one fallback chain.
    pub fn fallback_image_detectors(
        &self,
        names: &[String],
    ) -> Result<FallbackHandle<dyn ImageDetector>, RegistryError> {
        let mut members = Vec::with_capacity(names.len());
        for name in names {
            members.push(self.resolve_image_detector(name)?);
        }
        Ok(FallbackHandle::new(members))
    }
}
