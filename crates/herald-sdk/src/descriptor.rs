//! Description of a single event parameter

use crate::types::{ParamFlags, ParamKind, TypeInfo};
use std::fmt;
use std::sync::{Arc, Weak};

/// Type identity and qualifiers of one event parameter
///
/// Equality compares kind, canonical name and the pointer flag only; the
/// reference and const qualifiers are recorded but ignored, so by-value and
/// by-reference parameters match each other.
#[derive(Clone)]
pub struct ParamDescriptor {
    type_name: Arc<str>,
    kind: ParamKind,
    flags: ParamFlags,
    link: Option<Weak<TypeInfo>>,
}

impl ParamDescriptor {
    /// Create an unqualified descriptor
    pub fn new(kind: ParamKind, type_name: impl Into<Arc<str>>) -> Self {
        Self {
            type_name: type_name.into(),
            kind,
            flags: ParamFlags::NONE,
            link: None,
        }
    }

    /// Descriptor for a registered type
    pub fn from_type_info(info: &Arc<TypeInfo>) -> Self {
        let flags = if info.kind() == ParamKind::Object {
            ParamFlags::POINTER
        } else {
            ParamFlags::NONE
        };
        Self {
            type_name: Arc::from(info.name()),
            kind: info.kind(),
            flags,
            link: Some(Arc::downgrade(info)),
        }
    }

    /// Add qualifier flags
    pub fn with_flags(mut self, flags: ParamFlags) -> Self {
        self.flags = self.flags | flags;
        self
    }

    /// Attach a type registry link
    pub fn with_link(mut self, link: Option<Weak<TypeInfo>>) -> Self {
        self.link = link;
        self
    }

    /// Canonical type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Kind tag
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// Qualifier flags
    pub fn flags(&self) -> ParamFlags {
        self.flags
    }

    /// Passed by reference
    pub fn is_reference(&self) -> bool {
        self.flags.contains(ParamFlags::REFERENCE)
    }

    /// Passed as a pointer
    pub fn is_pointer(&self) -> bool {
        self.flags.contains(ParamFlags::POINTER)
    }

    /// Const-qualified
    pub fn is_const(&self) -> bool {
        self.flags.contains(ParamFlags::CONST)
    }

    /// Passed by non-const reference; mutations must be written back
    pub fn is_mutable_reference(&self) -> bool {
        self.is_reference() && !self.is_const()
    }

    /// Linked registry entry, if still alive
    pub fn linked_type(&self) -> Option<Arc<TypeInfo>> {
        self.link.as_ref().and_then(Weak::upgrade)
    }

    /// Check whether an argument described by `source` may be passed to this parameter
    pub fn check_invoke_convertible_from(&self, source: &ParamDescriptor) -> bool {
        if self == source {
            return true;
        }
        if !self.kind.accepts_subtypes() || self.kind != source.kind {
            return false;
        }
        match (source.linked_type(), self.linked_type()) {
            (Some(from), Some(to)) if self.kind == ParamKind::Object => from.is_subtype_of(&to),
            (Some(from), Some(to)) => from.is_subtype_of(&to) && from.converts_to(&to),
            _ => false,
        }
    }
}

impl PartialEq for ParamDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.type_name == other.type_name
            && self.is_pointer() == other.is_pointer()
    }
}

impl Eq for ParamDescriptor {}

impl fmt::Debug for ParamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamDescriptor")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("flags", &self.flags)
            .field("linked", &self.linked_type().is_some())
            .finish()
    }
}

impl fmt::Display for ParamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name)?;
        if self.is_pointer() {
            f.write_str("*")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;
    use std::any::TypeId;

    struct Actor;
    struct Pawn;
    struct Door;

    fn registry() -> TypeRegistry {
        TypeRegistry::builder()
            .register_class::<Actor>("Actor")
            .register_subclass::<Pawn, Actor>("Pawn")
            .register_class::<Door>("Door")
            .build()
    }

    fn class_param<C: 'static>(types: &TypeRegistry) -> ParamDescriptor {
        ParamDescriptor::from_type_info(types.get(TypeId::of::<C>()).unwrap())
    }

    #[test]
    fn test_equality_ignores_reference_and_const() {
        let by_value = ParamDescriptor::new(ParamKind::String, "String");
        let by_ref = ParamDescriptor::new(ParamKind::String, "String")
            .with_flags(ParamFlags::REFERENCE | ParamFlags::CONST);
        assert_eq!(by_value, by_ref);
        assert!(by_ref.is_reference());
        assert!(!by_ref.is_mutable_reference());
    }

    #[test]
    fn test_equality_checks_pointer() {
        let plain = ParamDescriptor::new(ParamKind::Object, "Actor");
        let pointer = ParamDescriptor::new(ParamKind::Object, "Actor").with_flags(ParamFlags::POINTER);
        assert_ne!(plain, pointer);
    }

    #[test]
    fn test_equality_checks_kind_and_name() {
        let a = ParamDescriptor::new(ParamKind::Int32, "i32");
        assert_ne!(a, ParamDescriptor::new(ParamKind::Int64, "i32"));
        assert_ne!(a, ParamDescriptor::new(ParamKind::Int32, "int"));
    }

    #[test]
    fn test_object_descriptor_is_pointer() {
        let types = registry();
        assert!(class_param::<Actor>(&types).is_pointer());
    }

    #[test]
    fn test_subtype_conversion() {
        let types = registry();
        let actor = class_param::<Actor>(&types);
        let pawn = class_param::<Pawn>(&types);
        let door = class_param::<Door>(&types);

        assert!(actor.check_invoke_convertible_from(&pawn));
        assert!(actor.check_invoke_convertible_from(&actor));
        assert!(!pawn.check_invoke_convertible_from(&actor));
        assert!(!actor.check_invoke_convertible_from(&door));
    }

    #[derive(Clone, Default)]
    struct Transform {
        x: f32,
    }

    #[derive(Clone, Default)]
    struct ScaledTransform {
        base: Transform,
        scale: f32,
    }

    impl AsRef<Transform> for ScaledTransform {
        fn as_ref(&self) -> &Transform {
            &self.base
        }
    }

    impl AsMut<Transform> for ScaledTransform {
        fn as_mut(&mut self) -> &mut Transform {
            &mut self.base
        }
    }

    #[derive(Clone, Default)]
    struct LooseTransform;

    #[test]
    fn test_aggregate_subtype_needs_conversion() {
        let transform = Arc::new(TypeInfo::value::<Transform>("Transform", ParamKind::Aggregate));
        let types = TypeRegistry::builder()
            .register_value::<Transform>("Transform", ParamKind::Aggregate)
            .register_derived_value::<ScaledTransform, Transform>("ScaledTransform")
            .register(
                TypeInfo::value::<LooseTransform>("LooseTransform", ParamKind::Aggregate)
                    .with_parent(transform),
            )
            .build();
        let base = class_param::<Transform>(&types);
        let scaled = class_param::<ScaledTransform>(&types);
        let loose = class_param::<LooseTransform>(&types);

        assert!(loose.linked_type().unwrap().is_subtype_of(&base.linked_type().unwrap()));
        assert!(base.check_invoke_convertible_from(&scaled));
        assert!(!base.check_invoke_convertible_from(&loose));
        assert!(!scaled.check_invoke_convertible_from(&base));
    }

    #[test]
    fn test_dead_link_only_matches_exactly() {
        let (actor, pawn) = {
            let types = registry();
            (class_param::<Actor>(&types), class_param::<Pawn>(&types))
        };
        assert!(actor.linked_type().is_none());
        assert!(actor.check_invoke_convertible_from(&actor));
        assert!(!actor.check_invoke_convertible_from(&pawn));
    }
}
