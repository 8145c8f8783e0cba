//! Records: what gets captured from a sub-object each cycle, and how it is
//! put back.
//!
//! # Composition
//!
//! A record is a [`Snapshot`]: a [`CommonData`] layer (the enabled flag) plus
//! a domain payload. Capturing and applying run an explicit, ordered
//! [`RecordChain`] of independent steps, so no layer depends on another
//! remembering to call its parent.
//!
//! ```text
//! RecordChain<R>
//!   ├─ "common"     enabled flag   ──▶ Snapshot.common
//!   ├─ "Transform"  position/angle ──▶ Snapshot.payload
//!   └─ ...
//! ```
//!
//! # Discovery
//!
//! Sub-object types are mapped to their chains in a [`RecordRegistry`] at
//! registration time. A sub-object whose type was never registered falls back
//! to one of three [`GenericKind`]s chosen from its declared [`Capabilities`].
//!
//! # Example
//!
//! ```ignore
//! #[derive(Default)]
//! struct Door { open: bool }
//!
//! impl SubObject for Door {}
//!
//! impl Recordable for Door {
//!     type Record = bool;
//!     fn capture(&self, record: &mut bool) { *record = self.open; }
//!     fn apply(&mut self, record: &bool) { self.open = *record; }
//! }
//!
//! let mut registry = RecordRegistry::new();
//! registry.register::<Door>();
//! ```

mod chain;
mod common;
mod error;
mod generic;
mod object;
mod registry;
mod track;

pub use chain::{RecordChain, RecordStep};
pub use common::{CommonData, Snapshot};
pub use error::{RecordError, RecordResult};
pub use generic::{GenericKind, StateBytes, decode_state, encode_state};
pub use object::{AsAny, Capabilities, Recordable, SubObject};
pub use registry::{RecordRegistry, TrackFactory};
pub use track::{ChainTrack, Track};
