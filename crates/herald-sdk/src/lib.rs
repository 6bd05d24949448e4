//! Herald SDK - type model and host collaborator contracts
//!
//! This crate holds everything an embedder needs to describe event
//! arguments and host objects, without depending on the dispatch engine:
//!
//! - [`ParamDescriptor`] and [`Signature`]: parameter type identity and
//!   compatibility rules
//! - [`EventParam`] / [`EventArgs`]: the statically typed argument model
//! - [`DynamicTuple`]: packed argument frames for reflected calls
//! - [`TypeRegistry`]: layout and lifecycle operations for aggregate,
//!   enum and object kinds
//! - [`Object`]: reflected method lookup and invocation
//!
//! # Example
//!
//! ```ignore
//! use herald_sdk::{DynamicTuple, EventArgs, Mut, TypeRegistry};
//!
//! let types = TypeRegistry::new();
//! let args = (3i32, Mut::new(String::from("hp")));
//! let frame = DynamicTuple::pack(&args, &types);
//! assert_eq!(frame.signature().name(), "i32, String");
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod args;
pub mod descriptor;
pub mod error;
pub mod name;
pub mod object;
pub mod param;
pub mod reflect;
pub mod signature;
pub mod tuple;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use args::EventArgs;
pub use descriptor::ParamDescriptor;
pub use error::{EventError, EventResult};
pub use name::{Name, Text};
pub use object::{Class, Obj, Object, ObjectRef, WeakObjectRef};
pub use param::{EventParam, Mut};
pub use reflect::{MethodHandle, ReflectedFunction, ReflectedParam};
pub use signature::{InvokeType, Signature, SignatureOrigin};
pub use tuple::{align_up, DynamicTuple};
pub use types::{ParamFlags, ParamKind, TypeInfo, TypeRegistry, TypeRegistryBuilder};
