use crate::ports::{DescriptorCatalog, ImageBuilder, ImageRegistry};

/// Application context holding the external collaborators of a conversion run.
pub struct AppContext<C: DescriptorCatalog, B: ImageBuilder, R: ImageRegistry> {
    catalog: C,
    builder: B,
    registry: R,
}

impl<C: DescriptorCatalog, B: ImageBuilder, R: ImageRegistry> AppContext<C, B, R> {
    /// Create a new application context.
    pub fn new(catalog: C, builder: B, registry: R) -> Self {
        Self { catalog, builder, registry }
    }

    /// Get a reference to the descriptor catalog.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Get a reference to the image builder.
    pub fn builder(&self) -> &B {
        &self.builder
    }

    /// Get a reference to the image registry.
    pub fn registry(&self) -> &R {
        &self.registry
    }
}
