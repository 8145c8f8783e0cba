//! The common data layer shared by every record.

use serde::{Deserialize, Serialize};

use crate::{RecordResult, SubObject};

/// State every sub-object has regardless of its domain payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonData {
    pub enabled: bool,
}

impl Default for CommonData {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl CommonData {
    pub(crate) fn capture<R>(object: &dyn SubObject, snapshot: &mut Snapshot<R>) -> RecordResult<()> {
        snapshot.common.enabled = object.is_enabled();
        Ok(())
    }

    pub(crate) fn apply<R>(object: &mut dyn SubObject, snapshot: &Snapshot<R>) -> RecordResult<()> {
        object.set_enabled(snapshot.common.enabled);
        Ok(())
    }
}

/// One timeline slot: common data plus a domain payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot<R> {
    pub common: CommonData,
    pub payload: R,
}
