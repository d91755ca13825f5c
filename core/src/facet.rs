//! Keyed collection whose elements carry "facets" (tags).
//!
//! Every key is bound to a slot index the first time it is `put`. Each facet
//! owns a bitset over slot indices, so "all elements carrying facets
//! f1..fn" is the AND of n bitsets.
//!
//! Slot indices are never reassigned: removing a key empties its slot, a
//! later `put` of the same key refills it, and new keys always get fresh
//! slots.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use fixedbitset::FixedBitSet;

/// Per-facet membership bitsets, grown on demand.
#[derive(Debug, Clone)]
struct FacetSets<F> {
    sets: HashMap<F, FixedBitSet>,
}

impl<F: Eq + Hash> FacetSets<F> {
    fn new() -> Self {
        Self {
            sets: HashMap::new(),
        }
    }

    fn insert(&mut self, facet: F, index: usize) {
        let set = self.sets.entry(facet).or_default();
        if set.len() <= index {
            set.grow(index + 1);
        }
        set.insert(index);
    }

    fn remove(&mut self, facet: &F, index: usize) {
        if let Some(set) = self.sets.get_mut(facet) {
            if index < set.len() {
                set.set(index, false);
            }
        }
    }

    /// Drop `index` from every facet.
    fn clear(&mut self, index: usize) {
        for set in self.sets.values_mut() {
            if index < set.len() {
                set.set(index, false);
            }
        }
    }

    fn contains(&self, facet: &F, index: usize) -> bool {
        self.sets.get(facet).is_some_and(|set| set.contains(index))
    }

    fn of(&self, index: usize) -> impl Iterator<Item = &F> {
        self.sets
            .iter()
            .filter(move |(_, set)| set.contains(index))
            .map(|(facet, _)| facet)
    }
}

/// A collection of keyed elements that can be retrieved by facet.
///
/// `put`/`get` by key are O(1) amortized. A query over `n` facets costs
/// O(n · slots / 32) for the bitset intersection plus one step per match.
#[derive(Debug, Clone)]
pub struct FacetedBundle<K, F, T> {
    slots: Vec<Option<T>>,
    occupied: FixedBitSet,
    indices: HashMap<K, usize>,
    facets: FacetSets<F>,
}

impl<K, F, T> FacetedBundle<K, F, T>
where
    K: Eq + Hash,
    F: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            occupied: FixedBitSet::new(),
            indices: HashMap::new(),
            facets: FacetSets::new(),
        }
    }

    /// Store `element` at `key`, replacing any previous element there.
    ///
    /// The slot starts out with no facets; apply them through the returned
    /// entry.
    pub fn put(&mut self, key: K, element: T) -> EntryMut<'_, F, T> {
        let next = self.indices.len();
        let index = *self.indices.entry(key).or_insert(next);

        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || None);
        }
        if self.occupied.len() <= index {
            self.occupied.grow(index + 1);
        }
        self.occupied.insert(index);
        self.facets.clear(index);

        let element = self.slots[index].insert(element);
        EntryMut {
            index,
            element,
            facets: &mut self.facets,
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<Entry<'_, F, T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = *self.indices.get(key)?;
        self.entry_at(index)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<EntryMut<'_, F, T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = *self.indices.get(key)?;
        let element = self.slots.get_mut(index)?.as_mut()?;
        Some(EntryMut {
            index,
            element,
            facets: &mut self.facets,
        })
    }

    /// Whether an element is currently stored at `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Take the element at `key` out of the bundle, clearing its facets.
    ///
    /// The key keeps its slot for a later `put`.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = *self.indices.get(key)?;
        let element = self.slots.get_mut(index)?.take()?;
        self.occupied.set(index, false);
        self.facets.clear(index);
        Some(element)
    }

    /// Elements carrying every facet in `facets`, in slot order.
    ///
    /// No facets matches every element; a facet never applied to anything
    /// matches nothing.
    pub fn with_facets<I, Q>(&self, facets: I) -> Vec<&T>
    where
        I: IntoIterator<Item = Q>,
        Q: Borrow<F>,
    {
        let mut matching = self.occupied.clone();
        let mut queried = 0usize;
        for facet in facets {
            let facet: &F = facet.borrow();
            queried += 1;
            match self.facets.sets.get(facet) {
                Some(set) => matching.intersect_with(set),
                None => {
                    matching.clear();
                    break;
                }
            }
        }

        let found: Vec<&T> = matching
            .ones()
            .filter_map(|index| self.slots.get(index).and_then(Option::as_ref))
            .collect();
        tracing::trace!(queried, matched = found.len(), "facet query");
        found
    }

    /// Occupied entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Entry<'_, F, T>> {
        self.occupied.ones().filter_map(move |index| self.entry_at(index))
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        self.occupied.count_ones(..)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots ever assigned, occupied or not.
    pub fn slot_count(&self) -> usize {
        self.indices.len()
    }

    fn entry_at(&self, index: usize) -> Option<Entry<'_, F, T>> {
        let element = self.slots.get(index)?.as_ref()?;
        Some(Entry {
            index,
            element,
            facets: &self.facets,
        })
    }
}

impl<K, F, T> Default for FacetedBundle<K, F, T>
where
    K: Eq + Hash,
    F: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only handle on a stored element.
pub struct Entry<'a, F, T> {
    index: usize,
    element: &'a T,
    facets: &'a FacetSets<F>,
}

impl<'a, F: Eq + Hash, T> Entry<'a, F, T> {
    pub fn element(&self) -> &'a T {
        self.element
    }

    /// Slot holding this element.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn has_facet(&self, facet: &F) -> bool {
        self.facets.contains(facet, self.index)
    }

    /// Facets applied to this element, in no particular order.
    pub fn facets(&self) -> impl Iterator<Item = &'a F> {
        self.facets.of(self.index)
    }
}

/// Mutable handle on a stored element; applies and removes facets.
pub struct EntryMut<'a, F, T> {
    index: usize,
    element: &'a mut T,
    facets: &'a mut FacetSets<F>,
}

impl<F: Eq + Hash, T> EntryMut<'_, F, T> {
    pub fn add_facets<I>(&mut self, facets: I) -> &mut Self
    where
        I: IntoIterator<Item = F>,
    {
        for facet in facets {
            self.facets.insert(facet, self.index);
        }
        self
    }

    pub fn remove_facets<I, Q>(&mut self, facets: I) -> &mut Self
    where
        I: IntoIterator<Item = Q>,
        Q: Borrow<F>,
    {
        for facet in facets {
            let facet: &F = facet.borrow();
            self.facets.remove(facet, self.index);
        }
        self
    }

    /// Replace all facets of this element with `facets`.
    pub fn set_facets<I>(&mut self, facets: I) -> &mut Self
    where
        I: IntoIterator<Item = F>,
    {
        self.facets.clear(self.index);
        self.add_facets(facets)
    }

    pub fn has_facet(&self, facet: &F) -> bool {
        self.facets.contains(facet, self.index)
    }

    pub fn element(&self) -> &T {
        self.element
    }

    pub fn element_mut(&mut self) -> &mut T {
        self.element
    }

    pub fn index(&self) -> usize {
        self.index
    }
}
