//! Sub-object contracts.
//!
//! A sub-object is one stateful piece attached to an entity. It exposes the
//! common data layer (an enabled flag) through [`SubObject`], and optionally
//! a typed record through [`Recordable`].

use std::any::Any;

use bitflags::bitflags;

use crate::RecordResult;

bitflags! {
    /// What a sub-object can have captured without a custom record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Has a meaningful enabled flag.
        const ENABLE = 1 << 0;
        /// Can save and load its whole state through the byte hooks.
        const STATE = 1 << 1;
    }
}

/// Type-erased access, implemented for every `'static` type.
///
/// Call it on `&dyn SubObject`, never on a `Box<dyn SubObject>` directly:
/// the box itself is `Any` too.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A stateful piece of an entity.
///
/// The defaults describe a sub-object with nothing to capture.
pub trait SubObject: AsAny + Send {
    /// Capabilities used to pick a generic record when the type has no
    /// registered chain.
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn set_enabled(&mut self, _enabled: bool) {}

    /// Write the complete state into `out` (cleared by the caller).
    fn save_state(&self, _out: &mut Vec<u8>) -> RecordResult<()> {
        Ok(())
    }

    /// Restore state previously written by [`save_state`](Self::save_state).
    fn load_state(&mut self, _bytes: &[u8]) -> RecordResult<()> {
        Ok(())
    }
}

/// A sub-object that supplies its own record type.
///
/// Registered with [`RecordRegistry::register`](crate::RecordRegistry::register),
/// the chain is `common` followed by this type's capture/apply pair.
pub trait Recordable: SubObject + Sized {
    /// Domain payload. Slots are preallocated from `Default` and overwritten
    /// in place.
    type Record: Default + Send + Sync + 'static;

    fn capture(&self, record: &mut Self::Record);

    fn apply(&mut self, record: &Self::Record);
}
