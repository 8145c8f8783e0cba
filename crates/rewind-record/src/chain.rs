//! Ordered capture/apply chains.

use std::fmt;

use smallvec::SmallVec;

use crate::{CommonData, RecordError, RecordResult, Snapshot, SubObject};

type CaptureFn<R> = Box<dyn Fn(&dyn SubObject, &mut Snapshot<R>) -> RecordResult<()> + Send + Sync>;
type ApplyFn<R> = Box<dyn Fn(&mut dyn SubObject, &Snapshot<R>) -> RecordResult<()> + Send + Sync>;

/// One independent capture/apply capability.
pub struct RecordStep<R> {
    name: &'static str,
    capture: CaptureFn<R>,
    apply: ApplyFn<R>,
}

impl<R> RecordStep<R> {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// An explicit, ordered list of record steps.
///
/// Capture runs every step front to back, and so does apply. Adding a layer
/// means pushing a step; nothing relies on one step invoking another.
pub struct RecordChain<R> {
    steps: SmallVec<[RecordStep<R>; 4]>,
}

impl<R: 'static> RecordChain<R> {
    /// A chain with no steps; captures nothing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: SmallVec::new(),
        }
    }

    /// A chain starting with the common data step.
    #[must_use]
    pub fn with_common_data() -> Self {
        Self::new().step("common", CommonData::capture, CommonData::apply)
    }

    /// Append a step working on the type-erased sub-object.
    #[must_use]
    pub fn step(
        mut self,
        name: &'static str,
        capture: impl Fn(&dyn SubObject, &mut Snapshot<R>) -> RecordResult<()> + Send + Sync + 'static,
        apply: impl Fn(&mut dyn SubObject, &Snapshot<R>) -> RecordResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.steps.push(RecordStep {
            name,
            capture: Box::new(capture),
            apply: Box::new(apply),
        });
        self
    }

    /// Append a step for a concrete sub-object type, operating on the payload.
    ///
    /// The step fails with [`RecordError::TypeMismatch`] when handed any
    /// other type.
    #[must_use]
    pub fn typed_step<S: SubObject>(
        self,
        name: &'static str,
        capture: fn(&S, &mut R),
        apply: fn(&mut S, &R),
    ) -> Self {
        self.step(
            name,
            move |object, snapshot| {
                capture(downcast_ref::<S>(object)?, &mut snapshot.payload);
                Ok(())
            },
            move |object, snapshot| {
                apply(downcast_mut::<S>(object)?, &snapshot.payload);
                Ok(())
            },
        )
    }

    /// Run every capture step in order.
    pub fn capture(&self, object: &dyn SubObject, snapshot: &mut Snapshot<R>) -> RecordResult<()> {
        for step in &self.steps {
            (step.capture)(object, snapshot)?;
        }
        Ok(())
    }

    /// Run every apply step in order.
    pub fn apply(&self, object: &mut dyn SubObject, snapshot: &Snapshot<R>) -> RecordResult<()> {
        for step in &self.steps {
            (step.apply)(object, snapshot)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names, in execution order.
    pub fn step_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().map(RecordStep::name)
    }
}

impl<R: 'static> Default for RecordChain<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: 'static> fmt::Debug for RecordChain<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.step_names()).finish()
    }
}

fn downcast_ref<S: SubObject>(object: &dyn SubObject) -> RecordResult<&S> {
    let actual = object.type_name();
    object
        .as_any()
        .downcast_ref::<S>()
        .ok_or(RecordError::TypeMismatch {
            expected: std::any::type_name::<S>(),
            actual,
        })
}

fn downcast_mut<S: SubObject>(object: &mut dyn SubObject) -> RecordResult<&mut S> {
    let actual = object.type_name();
    object
        .as_any_mut()
        .downcast_mut::<S>()
        .ok_or(RecordError::TypeMismatch {
            expected: std::any::type_name::<S>(),
            actual,
        })
}
