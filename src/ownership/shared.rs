// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Reference-counted shared ownership with weak observers.
//!
//! ```text
//! Shared<T> ---+
//! Shared<T> ---+--> ControlBlock { strong, weak, value: Option<Box<T>> }
//! WeakRef<T> --+
//!
//! strong 1 -> 0   value dropped
//! strong == 0 && weak == 0   control block freed (last handle gone)
//! release()   strong == 1 ? value moved out as Owned<T> : untouched
//! ```
//!
//! The counters are explicit so that a shared value can be handed back to a
//! single owner once every other owner has let go, which `Rc` alone does not
//! express for unsized values.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use super::Owned;

struct ControlBlock<T: ?Sized> {
    strong: Cell<usize>,
    weak: Cell<usize>,
    value: RefCell<Option<Box<T>>>,
}

impl<T: ?Sized> ControlBlock<T> {
    fn new(value: Box<T>) -> Rc<Self> {
        Rc::new(Self {
            strong: Cell::new(1),
            weak: Cell::new(0),
            value: RefCell::new(Some(value)),
        })
    }

    fn is_live(&self) -> bool {
        self.strong.get() > 0
    }

    fn inc_strong(&self) {
        self.strong.set(self.strong.get() + 1);
    }

    /// Drops one strong reference, destroying the value on the last one.
    fn dec_strong(&self) {
        let remaining = self.strong.get() - 1;
        self.strong.set(remaining);
        if remaining == 0 {
            // Take first so the value's own drop can observe this block.
            let value = self.value.borrow_mut().take();
            drop(value);
        }
    }

    fn inc_weak(&self) {
        self.weak.set(self.weak.get() + 1);
    }

    fn dec_weak(&self) {
        self.weak.set(self.weak.get() - 1);
    }
}

/// Shared owner of a heap-allocated value.
///
/// Cloning increments the strong count. The value is dropped exactly once,
/// when the last strong handle is cleared or dropped. Access goes through
/// [`borrow`](Self::borrow) / [`borrow_mut`](Self::borrow_mut), which follow
/// `RefCell` rules.
pub struct Shared<T: ?Sized> {
    block: Option<Rc<ControlBlock<T>>>,
}

impl<T> Shared<T> {
    /// Allocates `value` with a fresh control block.
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }

    /// Replaces the held value with `value`.
    ///
    /// The previous value is released first, so it is destroyed here if this
    /// was its last strong handle.
    pub fn allocate(&mut self, value: T) {
        self.allocate_boxed(Box::new(value));
    }
}

impl<T: ?Sized> Shared<T> {
    /// Creates an empty handle. No control block is allocated.
    #[must_use]
    pub const fn empty() -> Self {
        Self { block: None }
    }

    fn from_box(value: Box<T>) -> Self {
        Self {
            block: Some(ControlBlock::new(value)),
        }
    }

    /// Like [`allocate`](Self::allocate) for boxed and unsized values, e.g. a
    /// concrete implementation stored behind `Shared<dyn Trait>`.
    pub fn allocate_boxed(&mut self, value: Box<T>) {
        self.clear();
        *self = Self::from_box(value);
    }

    /// Returns `true` if this handle holds nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.block.is_none()
    }

    /// Number of strong handles sharing the value (0 for an empty handle).
    #[must_use]
    pub fn strong_count(&self) -> usize {
        self.block.as_ref().map_or(0, |block| block.strong.get())
    }

    /// Number of weak handles observing the value (0 for an empty handle).
    #[must_use]
    pub fn weak_count(&self) -> usize {
        self.block.as_ref().map_or(0, |block| block.weak.get())
    }

    /// Identity comparison: both empty, or both sharing one control block.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.block, &other.block) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Borrows the value, or returns `None` for an empty handle.
    ///
    /// # Panics
    ///
    /// Panics if the value is currently mutably borrowed.
    #[must_use]
    pub fn get(&self) -> Option<Ref<'_, T>> {
        let block = self.block.as_ref()?;
        Ref::filter_map(block.value.borrow(), |value| value.as_deref()).ok()
    }

    /// Borrows the value.
    ///
    /// # Panics
    ///
    /// Panics if the handle is empty or the value is mutably borrowed.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, T> {
        match self.get() {
            Some(value) => value,
            None => panic!("borrowed an empty Shared handle"),
        }
    }

    /// Mutably borrows the value.
    ///
    /// # Panics
    ///
    /// Panics if the handle is empty or the value is already borrowed.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        let Some(block) = self.block.as_ref() else {
            panic!("borrowed an empty Shared handle");
        };
        RefMut::map(block.value.borrow_mut(), |value| match value.as_deref_mut() {
            Some(value) => value,
            None => panic!("live Shared handle without a value"),
        })
    }

    /// Drops this strong reference and leaves the handle empty.
    pub fn clear(&mut self) {
        if let Some(block) = self.block.take() {
            block.dec_strong();
        }
    }

    /// Moves the value out of a shared handle and leaves `self` empty.
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self {
            block: self.block.take(),
        }
    }

    /// Reclaims exclusive ownership if this is the only strong handle.
    ///
    /// On success the value moves into the returned [`Owned`], this handle
    /// becomes empty and any weak handles stop upgrading. Otherwise nothing
    /// changes and `None` is returned; an empty handle always fails.
    pub fn release(&mut self) -> Option<Owned<T>> {
        let block = self.block.as_ref()?;
        if block.strong.get() != 1 {
            return None;
        }
        let value = block.value.borrow_mut().take();
        block.strong.set(0);
        self.block = None;
        value.map(Owned::from_box)
    }

    /// Creates a weak observer of this value.
    #[must_use]
    pub fn downgrade(&self) -> WeakRef<T> {
        WeakRef::from(self)
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        if let Some(block) = &self.block {
            block.inc_strong();
        }
        Self {
            block: self.block.clone(),
        }
    }
}

impl<T: ?Sized> Drop for Shared<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: ?Sized> Default for Shared<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> From<Owned<T>> for Shared<T> {
    /// Allocates a control block with strong count 1. An empty `Owned`
    /// becomes an empty `Shared` with no block.
    fn from(owned: Owned<T>) -> Self {
        owned.into_box().map_or_else(Self::empty, Self::from_box)
    }
}

impl<T: ?Sized> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("strong", &self.strong_count())
            .field("weak", &self.weak_count())
            .finish()
    }
}

/// Non-owning observer of a [`Shared`] value.
///
/// Holding a `WeakRef` never keeps the value alive; it only keeps the control
/// block around so that [`upgrade`](Self::upgrade) can tell the value is gone.
pub struct WeakRef<T: ?Sized> {
    block: Option<Rc<ControlBlock<T>>>,
}

impl<T: ?Sized> WeakRef<T> {
    /// Creates a weak handle that observes nothing.
    #[must_use]
    pub const fn new() -> Self {
        Self { block: None }
    }

    /// Returns `true` while at least one strong handle exists.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.block.as_ref().is_some_and(|block| block.is_live())
    }

    /// Obtains a strong handle, or an empty one if the value is gone.
    #[must_use]
    pub fn upgrade(&self) -> Shared<T> {
        match &self.block {
            Some(block) if block.is_live() => {
                block.inc_strong();
                Shared {
                    block: Some(Rc::clone(block)),
                }
            }
            _ => Shared::empty(),
        }
    }

    /// Stops observing and leaves the handle empty.
    pub fn clear(&mut self) {
        if let Some(block) = self.block.take() {
            block.dec_weak();
        }
    }
}

impl<T: ?Sized> From<&Shared<T>> for WeakRef<T> {
    fn from(shared: &Shared<T>) -> Self {
        if let Some(block) = &shared.block {
            block.inc_weak();
        }
        Self {
            block: shared.block.clone(),
        }
    }
}

impl<T: ?Sized> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        if let Some(block) = &self.block {
            block.inc_weak();
        }
        Self {
            block: self.block.clone(),
        }
    }
}

impl<T: ?Sized> Drop for WeakRef<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: ?Sized> Default for WeakRef<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for WeakRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRef")
            .field("live", &self.is_live())
            .finish()
    }
}
