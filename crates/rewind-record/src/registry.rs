//! Sub-object type to record chain mapping.

use std::{any::TypeId, sync::Arc};

use rewind_timeline::CycleIndex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{
    ChainTrack, GenericKind, RecordChain, Recordable, SubObject, Track,
    generic::{component_chain, stateless_chain, toggle_chain},
};

/// Creates tracks for one kind of sub-object.
pub trait TrackFactory: Send + Sync {
    fn record_name(&self) -> &'static str;

    /// Allocate a fresh track sized for `index`, born on its newest cycle.
    fn create(&self, index: &CycleIndex) -> Box<dyn Track>;
}

struct ChainFactory<R> {
    name: &'static str,
    chain: Arc<RecordChain<R>>,
}

impl<R: Default + Send + Sync + 'static> TrackFactory for ChainFactory<R> {
    fn record_name(&self) -> &'static str {
        self.name
    }

    fn create(&self, index: &CycleIndex) -> Box<dyn Track> {
        Box::new(ChainTrack::new(self.name, Arc::clone(&self.chain), index))
    }
}

fn factory<R: Default + Send + Sync + 'static>(
    name: &'static str,
    chain: RecordChain<R>,
) -> Arc<dyn TrackFactory> {
    Arc::new(ChainFactory {
        name,
        chain: Arc::new(chain),
    })
}

/// Registration-time map from sub-object type to record chain.
///
/// Lookups go by the concrete type of the attached sub-object. Types that
/// were never registered resolve to a generic chain chosen by
/// [`GenericKind::for_capabilities`].
pub struct RecordRegistry {
    by_type: FxHashMap<TypeId, Arc<dyn TrackFactory>>,
    stateless: Arc<dyn TrackFactory>,
    toggle: Arc<dyn TrackFactory>,
    component: Arc<dyn TrackFactory>,
}

impl Default for RecordRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_type: FxHashMap::default(),
            stateless: factory(GenericKind::Stateless.name(), stateless_chain()),
            toggle: factory(GenericKind::Toggle.name(), toggle_chain()),
            component: factory(GenericKind::Component.name(), component_chain()),
        }
    }

    /// Register `S` with the chain `common` then `S::capture`/`S::apply`.
    ///
    /// Registering a type twice replaces the earlier chain.
    pub fn register<S: Recordable>(&mut self) -> &mut Self {
        let chain = RecordChain::<S::Record>::with_common_data().typed_step::<S>(
            short_type_name::<S>(),
            S::capture,
            S::apply,
        );
        self.register_chain::<S, S::Record>(chain)
    }

    /// Register `S` with a hand-built chain.
    pub fn register_chain<S, R>(&mut self, chain: RecordChain<R>) -> &mut Self
    where
        S: SubObject,
        R: Default + Send + Sync + 'static,
    {
        let name = short_type_name::<S>();
        debug!(name, steps = chain.len(), "registered record chain");
        self.by_type.insert(TypeId::of::<S>(), factory(name, chain));
        self
    }

    #[must_use]
    pub fn is_registered<S: SubObject>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<S>())
    }

    /// Number of explicitly registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Factory for the concrete type behind `object`.
    #[must_use]
    pub fn resolve(&self, object: &dyn SubObject) -> Arc<dyn TrackFactory> {
        if let Some(factory) = self.by_type.get(&object.as_any().type_id()) {
            return Arc::clone(factory);
        }

        let kind = GenericKind::for_capabilities(object.capabilities());
        debug!(
            ty = object.type_name(),
            kind = kind.name(),
            "no registered chain; using generic record"
        );
        Arc::clone(match kind {
            GenericKind::Stateless => &self.stateless,
            GenericKind::Toggle => &self.toggle,
            GenericKind::Component => &self.component,
        })
    }
}

fn short_type_name<S>() -> &'static str {
    let full = std::any::type_name::<S>();
    full.rsplit("::").next().unwrap_or(full)
}
