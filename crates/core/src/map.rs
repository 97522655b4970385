//! Layered maps: an ordered stack of maps viewed as one logical map.
//!
//! Layer 0 is the oldest (lowest priority); the last layer is the latest
//! (highest priority). Lookups resolve a key against the latest layer that
//! holds it, so newer layers shadow older ones while keys missing from the
//! newer layers still fall through.
//!
//! Keys must be totally ordered (`K: Ord`). Key enumeration is sorted by
//! that order, never by layer or insertion order.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::ops::{Add, Index};

use tracing::{debug, trace};

use crate::error::{ConstructionError, Error, Result};

/// A sequence of maps treated as a single map with shadowing.
///
/// The layer list is the only state. It can be read through [`layers`]
/// and changed only through [`insert`], [`remove`] and concatenation.
///
/// [`layers`]: LayeredMap::layers
/// [`insert`]: LayeredMap::insert
/// [`remove`]: LayeredMap::remove
#[derive(Debug, Clone)]
pub struct LayeredMap<K, V> {
    layers: Vec<BTreeMap<K, V>>,
}

impl<K: Ord, V> LayeredMap<K, V> {
    /// Build a layered map from one or more layers, oldest first.
    ///
    /// Empty layers are dropped. Fails with [`ConstructionError::NoLayers`]
    /// when nothing is provided and with [`ConstructionError::AllEmpty`]
    /// when every provided layer is empty.
    pub fn new<I>(layers: I) -> std::result::Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = BTreeMap<K, V>>,
    {
        let mut provided = 0usize;
        let layers: Vec<BTreeMap<K, V>> = layers
            .into_iter()
            .inspect(|_| provided += 1)
            .filter(|layer| !layer.is_empty())
            .collect();

        if provided == 0 {
            return Err(ConstructionError::NoLayers);
        }
        if layers.is_empty() {
            return Err(ConstructionError::AllEmpty);
        }
        if layers.len() < provided {
            trace!(dropped = provided - layers.len(), "Dropped empty layers");
        }

        Ok(Self { layers })
    }

    /// Build a layered map holding a single non-empty layer.
    pub fn single(layer: BTreeMap<K, V>) -> std::result::Result<Self, ConstructionError> {
        Self::new([layer])
    }

    /// Number of distinct keys visible across all layers.
    pub fn len(&self) -> usize {
        self.key_set().len()
    }

    /// True when no layer holds any key.
    ///
    /// Layers emptied by [`remove`](LayeredMap::remove) stay in place until
    /// the next concatenation, so a map can hold layers and no keys.
    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(BTreeMap::is_empty)
    }

    /// True iff the map holds more than one layer.
    ///
    /// This is a layer-count check, not a key check: a map with a single
    /// populated layer is not truthy, and two emptied layers are.
    pub fn is_truthy(&self) -> bool {
        self.layers.len() > 1
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// The layers, oldest first.
    pub fn layers(&self) -> &[BTreeMap<K, V>] {
        &self.layers
    }

    pub fn into_layers(self) -> Vec<BTreeMap<K, V>> {
        self.layers
    }

    /// True if any layer holds the key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.layers.iter().any(|layer| layer.contains_key(key))
    }

    /// The value from the latest layer holding the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.layers.iter().rev().find_map(|layer| layer.get(key))
    }

    /// Like [`get`](LayeredMap::get), but a missing key is an
    /// [`Error::NotFound`].
    pub fn try_get<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Ord + fmt::Debug + ?Sized,
    {
        self.get(key).ok_or_else(|| Error::not_found(key))
    }

    /// Every value stored for the key, oldest layer first.
    ///
    /// Returns the whole shadow chain rather than the winner. A key held by
    /// no layer yields an empty vector.
    pub fn get_all<Q>(&self, key: &Q) -> Vec<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.layers.iter().filter_map(|layer| layer.get(key)).collect()
    }

    /// Set a value.
    ///
    /// If some layer already holds the key, the latest such layer is
    /// updated in place and the previous value returned; older layers keep
    /// their values. Otherwise a new single-entry layer is appended.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        for layer in self.layers.iter_mut().rev() {
            if let Some(slot) = layer.get_mut(&key) {
                return Some(std::mem::replace(slot, value));
            }
        }

        debug!(layers = self.layers.len() + 1, "Appending single-entry layer");
        self.layers.push(BTreeMap::from([(key, value)]));
        None
    }

    /// Remove the key from every layer that holds it.
    ///
    /// Returns the removed values, oldest layer first. Layers left empty
    /// stay in place. Fails with [`Error::NotFound`] if no layer held the key.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<Vec<V>>
    where
        K: Borrow<Q>,
        Q: Ord + fmt::Debug + ?Sized,
    {
        let removed: Vec<V> = self
            .layers
            .iter_mut()
            .filter_map(|layer| layer.remove(key))
            .collect();

        if removed.is_empty() {
            return Err(Error::not_found(key));
        }
        if removed.len() > 1 {
            debug!(count = removed.len(), "Removed shadowed key from multiple layers");
        }
        Ok(removed)
    }

    /// Distinct visible keys in ascending order.
    ///
    /// Each call builds a fresh iterator.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.key_set().into_iter()
    }

    /// `(key, resolved value)` pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        let mut resolved = BTreeMap::new();
        for layer in &self.layers {
            resolved.extend(layer.iter());
        }
        resolved.into_iter()
    }

    /// Resolved values in ascending key order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Flatten into one map; later layers win.
    pub fn merged(&self) -> BTreeMap<K, V>
    where
        K: Clone,
        V: Clone,
    {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Add a layer on top.
    ///
    /// An empty layer leaves the map untouched. Otherwise the result is
    /// rebuilt like a fresh map, so layers emptied by
    /// [`remove`](LayeredMap::remove) are dropped.
    pub fn push_layer(self, layer: BTreeMap<K, V>) -> Self {
        if layer.is_empty() {
            return self;
        }
        let mut layers = self.into_non_empty_layers();
        layers.push(layer);
        Self { layers }
    }

    /// Add a layer underneath. Mirrors [`push_layer`](LayeredMap::push_layer).
    pub fn prepend_layer(self, layer: BTreeMap<K, V>) -> Self {
        if layer.is_empty() {
            return self;
        }
        let mut layers = vec![layer];
        layers.extend(self.into_non_empty_layers());
        Self { layers }
    }

    /// Stack all of `other`'s layers on top of this map's layers.
    ///
    /// The joined list goes through [`new`](LayeredMap::new), so emptied
    /// layers are dropped and two fully emptied maps give
    /// [`ConstructionError::AllEmpty`].
    pub fn extend_layers(
        self,
        other: LayeredMap<K, V>,
    ) -> std::result::Result<Self, ConstructionError> {
        Self::new(self.layers.into_iter().chain(other.layers))
    }

    fn into_non_empty_layers(self) -> Vec<BTreeMap<K, V>> {
        let before = self.layers.len();
        let layers: Vec<_> = self
            .layers
            .into_iter()
            .filter(|layer| !layer.is_empty())
            .collect();
        if layers.len() < before {
            trace!(dropped = before - layers.len(), "Dropped emptied layers");
        }
        layers
    }

    fn key_set(&self) -> BTreeSet<&K> {
        self.layers.iter().flat_map(BTreeMap::keys).collect()
    }
}

impl<K: Ord, V> TryFrom<Vec<BTreeMap<K, V>>> for LayeredMap<K, V> {
    type Error = ConstructionError;

    fn try_from(layers: Vec<BTreeMap<K, V>>) -> std::result::Result<Self, Self::Error> {
        Self::new(layers)
    }
}

impl<K, Q, V> Index<&Q> for LayeredMap<K, V>
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    type Output = V;

    /// Panics if no layer holds the key.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found in any layer")
    }
}

// --- Equality ---

/// Equal iff both sides expose the same keys with equal resolved values.
impl<K, V, W> PartialEq<LayeredMap<K, W>> for LayeredMap<K, V>
where
    K: Ord,
    V: PartialEq<W>,
{
    fn eq(&self, other: &LayeredMap<K, W>) -> bool {
        let mut keys = self.key_set();
        keys.extend(other.key_set());
        keys.into_iter()
            .all(|key| match (self.get(key), other.get(key)) {
                (Some(ours), Some(theirs)) => ours == theirs,
                _ => false,
            })
    }
}

impl<K: Ord, V: Eq> Eq for LayeredMap<K, V> {}

/// Equal iff every visible key is present in `other` with an equal value.
/// `other` may hold extra keys.
impl<K, V, W> PartialEq<BTreeMap<K, W>> for LayeredMap<K, V>
where
    K: Ord,
    V: PartialEq<W>,
{
    fn eq(&self, other: &BTreeMap<K, W>) -> bool {
        self.iter().all(|(key, ours)| match other.get(key) {
            Some(theirs) => ours == theirs,
            None => false,
        })
    }
}

impl<K, V, W, S> PartialEq<HashMap<K, W, S>> for LayeredMap<K, V>
where
    K: Ord + Hash,
    V: PartialEq<W>,
    S: BuildHasher,
{
    fn eq(&self, other: &HashMap<K, W, S>) -> bool {
        self.iter().all(|(key, ours)| match other.get(key) {
            Some(theirs) => ours == theirs,
            None => false,
        })
    }
}

/// Reflected form of `LayeredMap == BTreeMap`.
impl<K, V, W> PartialEq<LayeredMap<K, V>> for BTreeMap<K, W>
where
    K: Ord,
    V: PartialEq<W>,
{
    fn eq(&self, other: &LayeredMap<K, V>) -> bool {
        other == self
    }
}

impl<K, V, W, S> PartialEq<LayeredMap<K, V>> for HashMap<K, W, S>
where
    K: Ord + Hash,
    V: PartialEq<W>,
    S: BuildHasher,
{
    fn eq(&self, other: &LayeredMap<K, V>) -> bool {
        other == self
    }
}

// --- Concatenation ---

impl<K: Ord, V> Add<BTreeMap<K, V>> for LayeredMap<K, V> {
    type Output = LayeredMap<K, V>;

    fn add(self, rhs: BTreeMap<K, V>) -> Self::Output {
        self.push_layer(rhs)
    }
}

/// Fails only when both sides have had every key removed.
impl<K: Ord, V> Add for LayeredMap<K, V> {
    type Output = std::result::Result<LayeredMap<K, V>, ConstructionError>;

    fn add(self, rhs: LayeredMap<K, V>) -> Self::Output {
        self.extend_layers(rhs)
    }
}

impl<K: Ord, V> Add<LayeredMap<K, V>> for BTreeMap<K, V> {
    type Output = LayeredMap<K, V>;

    fn add(self, rhs: LayeredMap<K, V>) -> Self::Output {
        rhs.prepend_layer(self)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Display for LayeredMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LayeredMap(")?;
        for (i, layer) in self.layers.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{layer:?}")?;
        }
        f.write_str(")")
    }
}
