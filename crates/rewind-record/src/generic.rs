//! Generic records for sub-objects without a registered chain.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Capabilities, RecordChain, RecordResult, Snapshot, SubObject};

/// Fallback record shape, picked from a sub-object's capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericKind {
    /// Captures nothing.
    Stateless,
    /// Captures the enabled flag only.
    Toggle,
    /// Captures the enabled flag and the full serialized state.
    Component,
}

impl GenericKind {
    /// State wins over enable; a sub-object with neither is stateless.
    #[must_use]
    pub fn for_capabilities(capabilities: Capabilities) -> Self {
        if capabilities.contains(Capabilities::STATE) {
            Self::Component
        } else if capabilities.contains(Capabilities::ENABLE) {
            Self::Toggle
        } else {
            Self::Stateless
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Stateless => "generic-stateless",
            Self::Toggle => "generic-toggle",
            Self::Component => "generic-component",
        }
    }
}

/// Serialized sub-object state held by [`GenericKind::Component`] slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateBytes(pub Vec<u8>);

pub(crate) fn stateless_chain() -> RecordChain<()> {
    RecordChain::new()
}

pub(crate) fn toggle_chain() -> RecordChain<()> {
    RecordChain::with_common_data()
}

pub(crate) fn component_chain() -> RecordChain<StateBytes> {
    RecordChain::<StateBytes>::with_common_data().step(
        "state",
        |object: &dyn SubObject, snapshot: &mut Snapshot<StateBytes>| {
            // the buffer keeps its allocation across cycles
            snapshot.payload.0.clear();
            object.save_state(&mut snapshot.payload.0)
        },
        |object: &mut dyn SubObject, snapshot: &Snapshot<StateBytes>| {
            object.load_state(&snapshot.payload.0)
        },
    )
}

/// Encode `value` into `out`, replacing its contents.
///
/// Meant for [`SubObject::save_state`](crate::SubObject::save_state)
/// implementations.
pub fn encode_state<T: Serialize>(value: &T, out: &mut Vec<u8>) -> RecordResult<()> {
    out.clear();
    bincode::serialize_into(&mut *out, value)?;
    Ok(())
}

/// Decode state written by [`encode_state`].
pub fn decode_state<T: DeserializeOwned>(bytes: &[u8]) -> RecordResult<T> {
    Ok(bincode::deserialize(bytes)?)
}
