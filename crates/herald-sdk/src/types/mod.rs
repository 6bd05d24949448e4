//! Parameter type metadata

pub mod kind;
pub mod registry;

pub use kind::{ParamFlags, ParamKind};
pub use registry::{CopyFn, DropFn, InitFn, TypeInfo, TypeRegistry, TypeRegistryBuilder};
