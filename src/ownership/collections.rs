// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Containers that exclusively own their elements.
//!
//! ```text
//! OwnedVec    add / set / release(i) / release_back / release_and_shift
//! OwnedDeque  push_front / pop_front / push_back / pop_back
//! OwnedQueue  push / pop
//! OwnedMap    add / add_if_new / release(k) / erase(k) / iter
//!
//! release*  -> Owned<T>   (value survives)
//! clear/drop              (every remaining value dropped once)
//! ```

use std::borrow::Borrow;
use std::collections::hash_map::{Entry, RandomState};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::{BuildHasher, Hash};

use super::Owned;

/// Destination for bulk transfers such as [`OwnedMap::release_all`].
pub trait Appender<T: ?Sized> {
    /// Takes ownership of one element.
    fn append(&mut self, value: Owned<T>);
}

// --- OwnedVec ---

/// Sequence of exclusively owned values.
///
/// [`release`](Self::release) leaves a vacated slot behind so that indices of
/// later elements stay stable; [`get`](Self::get) reports such a slot as
/// `None`.
pub struct OwnedVec<T: ?Sized> {
    items: Vec<Owned<T>>,
}

impl<T: ?Sized> OwnedVec<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Number of slots, vacated ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index).and_then(Owned::get)
    }

    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index).and_then(Owned::get_mut)
    }

    pub fn add(&mut self, value: Owned<T>) {
        self.items.push(value);
    }

    /// Stores `value` at `index`, dropping the previous occupant.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: Owned<T>) {
        let len = self.items.len();
        match self.items.get_mut(index) {
            Some(slot) => *slot = value,
            None => panic!("OwnedVec::set index {index} out of bounds (len {len})"),
        }
    }

    /// Takes the value at `index`, leaving the slot vacated.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use = "dropping the released handle destroys the value"]
    pub fn release(&mut self, index: usize) -> Owned<T> {
        let len = self.items.len();
        match self.items.get_mut(index) {
            Some(slot) => slot.release(),
            None => panic!("OwnedVec::release index {index} out of bounds (len {len})"),
        }
    }

    /// Removes the last slot and returns its value (empty if none).
    #[must_use = "dropping the released handle destroys the value"]
    pub fn release_back(&mut self) -> Owned<T> {
        self.items.pop().unwrap_or_default()
    }

    /// Removes the value at `index`, shifting later elements down.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use = "dropping the released handle destroys the value"]
    pub fn release_and_shift(&mut self, index: usize) -> Owned<T> {
        self.items.remove(index)
    }

    /// Moves every value into `out`, leaving this sequence empty.
    pub fn release_all(&mut self, out: &mut impl Appender<T>) {
        for value in self.items.drain(..) {
            if !value.is_empty() {
                out.append(value);
            }
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.items, &mut other.items);
    }

    /// Iterates over occupied slots.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter_map(Owned::get)
    }
}

impl<T: ?Sized> Appender<T> for OwnedVec<T> {
    fn append(&mut self, value: Owned<T>) {
        self.add(value);
    }
}

impl<T: ?Sized> Default for OwnedVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for OwnedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedVec")
            .field("len", &self.items.len())
            .finish()
    }
}

// --- OwnedDeque ---

/// Double-ended queue of exclusively owned values.
pub struct OwnedDeque<T: ?Sized> {
    items: VecDeque<Owned<T>>,
}

impl<T: ?Sized> OwnedDeque<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index).and_then(Owned::get)
    }

    pub fn push_front(&mut self, value: Owned<T>) {
        self.items.push_front(value);
    }

    pub fn push_back(&mut self, value: Owned<T>) {
        self.items.push_back(value);
    }

    /// Removes the front value (empty handle if the deque is empty).
    #[must_use = "dropping the released handle destroys the value"]
    pub fn pop_front(&mut self) -> Owned<T> {
        self.items.pop_front().unwrap_or_default()
    }

    /// Removes the back value (empty handle if the deque is empty).
    #[must_use = "dropping the released handle destroys the value"]
    pub fn pop_back(&mut self) -> Owned<T> {
        self.items.pop_back().unwrap_or_default()
    }

    /// Removes the value at `index`, closing the gap.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use = "dropping the released handle destroys the value"]
    pub fn release_and_shift(&mut self, index: usize) -> Owned<T> {
        let len = self.items.len();
        match self.items.remove(index) {
            Some(value) => value,
            None => panic!("OwnedDeque::release_and_shift index {index} out of bounds (len {len})"),
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.items, &mut other.items);
    }
}

impl<T: ?Sized> Appender<T> for OwnedDeque<T> {
    fn append(&mut self, value: Owned<T>) {
        self.push_back(value);
    }
}

impl<T: ?Sized> Default for OwnedDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for OwnedDeque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedDeque")
            .field("len", &self.items.len())
            .finish()
    }
}

// --- OwnedQueue ---

/// FIFO queue of exclusively owned values.
pub struct OwnedQueue<T: ?Sized> {
    items: VecDeque<Owned<T>>,
}

impl<T: ?Sized> OwnedQueue<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.items.front().and_then(Owned::get)
    }

    pub fn push(&mut self, value: Owned<T>) {
        self.items.push_back(value);
    }

    /// Removes the oldest value (empty handle if the queue is empty).
    #[must_use = "dropping the released handle destroys the value"]
    pub fn pop(&mut self) -> Owned<T> {
        self.items.pop_front().unwrap_or_default()
    }

    /// Moves every value into `out` in FIFO order.
    pub fn release_all(&mut self, out: &mut impl Appender<T>) {
        while let Some(value) = self.items.pop_front() {
            out.append(value);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: ?Sized> Appender<T> for OwnedQueue<T> {
    fn append(&mut self, value: Owned<T>) {
        self.push(value);
    }
}

impl<T: ?Sized> Default for OwnedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for OwnedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedQueue")
            .field("len", &self.items.len())
            .finish()
    }
}

// --- OwnedMap ---

/// Hash map whose values are exclusively owned by the map.
///
/// Iteration borrows the map, so entries cannot be added or removed while an
/// iterator is alive.
pub struct OwnedMap<K, V: ?Sized, S = RandomState> {
    entries: HashMap<K, Owned<V>, S>,
}

impl<K, V: ?Sized> OwnedMap<K, V, RandomState> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K, V, S> OwnedMap<K, V, S>
where
    K: Eq + Hash,
    V: ?Sized,
    S: BuildHasher,
{
    /// Creates an empty map using `hasher` to hash keys.
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            entries: HashMap::with_hasher(hasher),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).and_then(Owned::get)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get_mut(key).and_then(Owned::get_mut)
    }

    /// Inserts `value` under `key`, dropping any value it replaces.
    pub fn add(&mut self, key: K, value: Owned<V>) {
        self.entries.insert(key, value);
    }

    /// Inserts `value` only if `key` is vacant.
    ///
    /// Returns `false` and drops `value` when the key is already present; the
    /// existing value is left in place.
    pub fn add_if_new(&mut self, key: K, value: Owned<V>) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    /// Removes the entry for `key` and hands back its value undropped.
    #[must_use = "dropping the released handle destroys the value"]
    pub fn release<Q>(&mut self, key: &Q) -> Option<Owned<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key)
    }

    /// Moves every value into `out`, leaving the map empty. Keys are dropped.
    pub fn release_all(&mut self, out: &mut impl Appender<V>) {
        for (_, value) in self.entries.drain() {
            out.append(value);
        }
    }

    /// Removes and drops the value for `key`. Returns whether it existed.
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.entries, &mut other.entries);
    }

    /// Iterates over entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| value.get().map(|value| (key, value)))
    }

    /// Iterates over keys in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }
}

impl<K, V: ?Sized> Default for OwnedMap<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V: ?Sized, S> fmt::Debug for OwnedMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedMap")
            .field("len", &self.entries.len())
            .finish()
    }
}
