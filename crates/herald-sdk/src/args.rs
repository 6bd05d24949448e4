//! Argument tuples
//!
//! An event's arguments are a Rust tuple of [`EventParam`]s. [`EventArgs`]
//! moves such a tuple in and out of a [`DynamicTuple`] positionally.

use crate::descriptor::ParamDescriptor;
use crate::param::EventParam;
use crate::signature::Signature;
use crate::tuple::DynamicTuple;
use crate::types::TypeRegistry;

/// A statically typed argument list
pub trait EventArgs: Sized + 'static {
    /// Number of arguments
    const ARITY: usize;

    /// Whether any argument is an in/out parameter
    const HAS_MUT: bool;

    /// Describe every argument in order
    fn descriptors(types: &TypeRegistry) -> Vec<ParamDescriptor>;

    /// Generic signature of this argument list
    fn signature(types: &TypeRegistry) -> Signature {
        Signature::generic(Self::descriptors(types))
    }

    /// Append every argument to `tuple`
    fn pack_into(&self, tuple: &mut DynamicTuple);

    /// Rebuild the arguments from a packed frame
    ///
    /// Fails if the frame's arity or slot storage types differ.
    fn unpack(tuple: &DynamicTuple) -> Option<Self>;

    /// Write in/out arguments into the frame
    fn store_back(&self, tuple: &mut DynamicTuple);

    /// Refresh in/out arguments from the frame
    fn load_back(&self, tuple: &DynamicTuple);
}

macro_rules! impl_event_args {
    ($len:expr $(, $param:ident : $idx:tt)*) => {
        impl<$($param: EventParam),*> EventArgs for ($($param,)*) {
            const ARITY: usize = $len;

            const HAS_MUT: bool = false $(|| $param::IS_MUT)*;

            fn descriptors(_types: &TypeRegistry) -> Vec<ParamDescriptor> {
                vec![$($param::descriptor(_types)),*]
            }

            #[allow(unused_variables)]
            fn pack_into(&self, tuple: &mut DynamicTuple) {
                $(tuple.push(&self.$idx);)*
            }

            fn unpack(tuple: &DynamicTuple) -> Option<Self> {
                if tuple.len() != $len {
                    return None;
                }
                Some(($(tuple.read_with::<$param::Storage, _>($idx, $param::from_storage)?,)*))
            }

            #[allow(unused_variables)]
            fn store_back(&self, tuple: &mut DynamicTuple) {
                $(
                    if $param::IS_MUT {
                        tuple.update_with::<$param::Storage>($idx, |slot| self.$idx.store_back(slot));
                    }
                )*
            }

            #[allow(unused_variables)]
            fn load_back(&self, tuple: &DynamicTuple) {
                $(
                    if $param::IS_MUT {
                        tuple.read_with::<$param::Storage, _>($idx, |slot| self.$idx.load_back(slot));
                    }
                )*
            }
        }
    };
}

impl_event_args!(0);
impl_event_args!(1, A: 0);
impl_event_args!(2, A: 0, B: 1);
impl_event_args!(3, A: 0, B: 1, C: 2);
impl_event_args!(4, A: 0, B: 1, C: 2, D: 3);
impl_event_args!(5, A: 0, B: 1, C: 2, D: 3, E: 4);
impl_event_args!(6, A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_event_args!(7, A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_event_args!(8, A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
impl_event_args!(9, A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8);
impl_event_args!(10, A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9);
impl_event_args!(11, A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10);
impl_event_args!(12, A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11);
impl_event_args!(13, A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11, M: 12);
impl_event_args!(14, A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11, M: 12, N: 13);
impl_event_args!(15, A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11, M: 12, N: 13, O: 14);
impl_event_args!(16, A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11, M: 12, N: 13, O: 14, P: 15);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::Mut;

    #[test]
    fn test_arity_and_mut_flags() {
        assert_eq!(<()>::ARITY, 0);
        assert!(!<()>::HAS_MUT);
        assert_eq!(<(i32, String)>::ARITY, 2);
        assert!(!<(i32, String)>::HAS_MUT);
        assert!(<(i32, Mut<String>)>::HAS_MUT);
    }

    #[test]
    fn test_signature_name() {
        let types = TypeRegistry::new();
        let signature = <(bool, Mut<String>, Vec<i32>)>::signature(&types);
        assert_eq!(signature.name(), "bool, String, Vec<i32>");
        assert!(signature.has_mutable_reference());
    }

    #[test]
    fn test_pack_and_unpack() {
        let args = (7i32, String::from("seven"), 7.5f64);
        let tuple = DynamicTuple::pack(&args, &TypeRegistry::new());
        assert_eq!(tuple.len(), 3);
        assert_eq!(<(i32, String, f64)>::unpack(&tuple), Some(args));
    }

    #[test]
    fn test_unpack_accepts_mut_for_value() {
        let tuple = DynamicTuple::pack(&(1i32, String::from("x")), &TypeRegistry::new());
        let args = <(i32, Mut<String>)>::unpack(&tuple).unwrap();
        assert_eq!(args.1.get(), "x");
    }

    #[test]
    fn test_unpack_rejects_wrong_shape() {
        let tuple = DynamicTuple::pack(&(1i32, 2i32), &TypeRegistry::new());
        assert!(<(i32,)>::unpack(&tuple).is_none());
        assert!(<(i32, i64)>::unpack(&tuple).is_none());
    }

    #[test]
    fn test_store_and_load_back() {
        let types = TypeRegistry::new();
        let args = (1i32, Mut::new(String::from("before")));
        let mut tuple = DynamicTuple::pack(&args, &types);

        let listener = <(i32, Mut<String>)>::unpack(&tuple).unwrap();
        listener.1.set("after".to_string());
        listener.store_back(&mut tuple);
        assert_eq!(tuple.get::<String>(1).map(String::as_str), Some("after"));

        args.load_back(&tuple);
        assert_eq!(args.1.get(), "after");
    }
}
