// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exclusive ownership handle.

use std::fmt;
use std::ops::{Deref, DerefMut};

/// Sole owner of a heap-allocated value.
///
/// An `Owned` is either empty or holds exactly one value. It cannot be
/// cloned; moving it moves the ownership. Dropping a non-empty handle drops the
/// value, and so does [`clear`](Self::clear) or assigning over it.
///
/// Dereferencing an empty handle panics. Use [`get`](Self::get) when
/// emptiness is an expected state.
///
/// ```
/// use kiln::ownership::Owned;
///
/// let mut a = Owned::new(String::from("node"));
/// let b = a.release();
/// assert!(a.is_empty());
/// assert_eq!(&*b, "node");
/// ```
pub struct Owned<T: ?Sized> {
    value: Option<Box<T>>,
}

impl<T> Owned<T> {
    /// Allocates `value` and takes ownership of it.
    pub fn new(value: T) -> Self {
        Self {
            value: Some(Box::new(value)),
        }
    }

    /// Consumes the handle and returns the value, if any.
    #[must_use]
    pub fn into_inner(self) -> Option<T> {
        self.value.map(|boxed| *boxed)
    }
}

impl<T: ?Sized> Owned<T> {
    /// Creates an empty handle.
    #[must_use]
    pub const fn empty() -> Self {
        Self { value: None }
    }

    /// Takes ownership of an already boxed value.
    ///
    /// This is how trait objects enter an `Owned`:
    /// `Owned::<dyn Trait>::from_box(Box::new(concrete))`.
    #[must_use]
    pub fn from_box(value: Box<T>) -> Self {
        Self { value: Some(value) }
    }

    /// Returns `true` if no value is held.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Borrows the value without asserting.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.value.as_deref()
    }

    /// Mutably borrows the value without asserting.
    #[must_use]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.value.as_deref_mut()
    }

    /// Moves the value into a new handle, leaving this one empty.
    #[must_use = "dropping the released handle destroys the value"]
    pub fn release(&mut self) -> Self {
        Self {
            value: self.value.take(),
        }
    }

    /// Destroys the held value (if any) and leaves the handle empty.
    pub fn clear(&mut self) {
        self.value = None;
    }

    /// Consumes the handle and returns the box.
    ///
    /// Needed to call an owned `dyn FnOnce`.
    #[must_use]
    pub fn into_box(self) -> Option<Box<T>> {
        self.value
    }

    /// Identity comparison against a borrowed value.
    #[must_use]
    pub fn points_to(&self, other: &T) -> bool {
        self.value
            .as_deref()
            .is_some_and(|held| std::ptr::addr_eq(held, other))
    }
}

impl<T: ?Sized> Default for Owned<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> From<Box<T>> for Owned<T> {
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T: ?Sized> Deref for Owned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.value.as_deref() {
            Some(value) => value,
            None => panic!("dereferenced an empty Owned handle"),
        }
    }
}

impl<T: ?Sized> DerefMut for Owned<T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.value.as_deref_mut() {
            Some(value) => value,
            None => panic!("dereferenced an empty Owned handle"),
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.as_deref() {
            Some(value) => f.debug_tuple("Owned").field(&value).finish(),
            None => f.write_str("Owned(<empty>)"),
        }
    }
}
