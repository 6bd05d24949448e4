//! Event center configuration

use herald_sdk::TypeRegistry;

/// Options for creating an [`super::EventCenter`]
#[derive(Debug, Clone)]
pub struct EventCenterOptions {
    /// Type registry used to link aggregate, enum and object parameters
    pub types: TypeRegistry,

    /// Deliver a packed copy of every successful broadcast to receive hooks
    pub forward_to_hooks: bool,
}

impl Default for EventCenterOptions {
    fn default() -> Self {
        Self {
            types: TypeRegistry::new(),
            forward_to_hooks: true,
        }
    }
}

impl EventCenterOptions {
    /// Create options with a specific type registry
    pub fn with_types(types: TypeRegistry) -> Self {
        Self {
            types,
            ..Default::default()
        }
    }

    /// Create options with the out-of-band channel disabled
    pub fn without_hooks() -> Self {
        Self {
            forward_to_hooks: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_sdk::ParamKind;

    #[test]
    fn test_default_options() {
        let options = EventCenterOptions::default();
        assert!(options.forward_to_hooks);
        assert!(options.types.is_empty());
    }

    #[test]
    fn test_options_builders() {
        let types = TypeRegistry::builder()
            .register_value::<u32>("u32", ParamKind::Int32)
            .build();
        assert_eq!(EventCenterOptions::with_types(types).types.len(), 1);
        assert!(!EventCenterOptions::without_hooks().forward_to_hooks);
    }
}
