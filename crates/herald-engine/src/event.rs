//! Declared events
//!
//! [`define_event!`](crate::define_event) declares a marker type that pins an
//! event name to its argument tuple. [`TypedEvent`] then registers and
//! broadcasts through the [`EventCenter`] with the argument type checked at
//! compile time.
//!
//! ```ignore
//! use herald_engine::{define_event, EventCenter, Mut};
//!
//! define_event!(pub PlayerDamaged("Player_Damaged") => (i32, Mut<i32>));
//!
//! let center = EventCenter::default();
//! center.event::<PlayerDamaged>().register_closure(|(amount, hp)| {
//!     hp.set(hp.get() - amount);
//! });
//! assert_eq!(PlayerDamaged::name(), "Player.Damaged");
//! ```

use crate::center::EventCenter;
use crate::observer::{Observer, ObserverHandle};
use herald_sdk::EventArgs;
use std::marker::PhantomData;
use std::rc::Rc;

/// An event name bound to a fixed argument tuple
pub trait EventDefinition: 'static {
    /// Argument tuple of the event
    type Args: EventArgs;

    /// Registered event name
    fn name() -> &'static str;
}

/// Turn a declared identifier such as `Player_Damaged` into `Player.Damaged`
pub fn domain_event_name(declared: &str) -> String {
    declared.replace('_', ".")
}

/// Declare one or more events
///
/// Each declaration produces an uninhabited type implementing
/// [`EventDefinition`]. Underscores in the declared name become dots.
///
/// ```ignore
/// define_event! {
///     pub PlayerDamaged("Player_Damaged") => (i32, Mut<i32>);
///     pub LevelLoaded("Level_Loaded") => (Name,);
/// }
/// ```
#[macro_export]
macro_rules! define_event {
    ($($(#[$meta:meta])* $vis:vis $ident:ident($name:literal) => $args:ty);+ $(;)?) => {
        $(
            $(#[$meta])*
            $vis enum $ident {}

            impl $crate::EventDefinition for $ident {
                type Args = $args;

                fn name() -> &'static str {
                    static NAME: $crate::__private::Lazy<::std::string::String> =
                        $crate::__private::Lazy::new(|| $crate::domain_event_name($name));
                    NAME.as_str()
                }
            }
        )+
    };
}

/// Typed view of one declared event on an [`EventCenter`]
pub struct TypedEvent<'a, E> {
    center: &'a EventCenter,
    _event: PhantomData<fn() -> E>,
}

impl<'a, E: EventDefinition> TypedEvent<'a, E> {
    pub(crate) fn new(center: &'a EventCenter) -> Self {
        Self {
            center,
            _event: PhantomData,
        }
    }

    /// Event name
    pub fn name(&self) -> &'static str {
        E::name()
    }

    /// Register a free function
    pub fn register_fn(&self, function: fn(&E::Args)) -> ObserverHandle {
        self.center.register(E::name(), Observer::function(function))
    }

    /// Register a closure
    pub fn register_closure<F>(&self, closure: F) -> ObserverHandle
    where
        F: Fn(&E::Args) + 'static,
    {
        self.center.register(E::name(), Observer::closure(closure))
    }

    /// Register a method on a weakly held `Rc` value
    pub fn register_shared<C: 'static>(
        &self,
        target: &Rc<C>,
        method: fn(&C, &E::Args),
    ) -> ObserverHandle {
        self.center
            .register(E::name(), Observer::shared_method(target, method))
    }

    /// Remove a free function
    pub fn unregister_fn(&self, function: fn(&E::Args)) -> bool {
        self.center
            .unregister(E::name(), &Observer::function(function))
    }

    /// Remove a method registered with [`Self::register_shared`]
    pub fn unregister_shared<C: 'static>(&self, target: &Rc<C>, method: fn(&C, &E::Args)) -> bool {
        self.center
            .unregister(E::name(), &Observer::shared_method(target, method))
    }

    /// Remove a listener by handle
    pub fn unregister(&self, handle: ObserverHandle) -> bool {
        self.center.unregister_handle(E::name(), handle)
    }

    /// Broadcast to every listener
    pub fn broadcast(&self, args: &E::Args) -> bool {
        self.center.broadcast(E::name(), args)
    }

    /// Declare the event's signature before any listener registers
    pub fn bind(&self) -> bool {
        self.center.bind_signature::<E::Args>(E::name())
    }

    /// Remove every listener
    pub fn clear(&self) {
        self.center.clear_event_observers(E::name());
    }

    /// Number of listeners
    pub fn num_observers(&self) -> usize {
        self.center.num_observers(E::name())
    }
}
