// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Ownership and lifetime primitives.
//!
//! ```text
//!   Owned<T>  ----(From)---->  Shared<T>  --downgrade-->  WeakRef<T>
//!      ^                         |   ^                       |
//!      '------- release() -------'   '------- upgrade() -----'
//!               (strong == 1)                (strong > 0)
//!
//!   OwnedVec / OwnedDeque / OwnedQueue / OwnedMap
//!     elements held as Owned<T>, released back as Owned<T>
//!     release_all() --> impl Appender<T>
//! ```
//!
//! Everything here is single-threaded: counters are plain `Cell`s and every
//! shared handle is `!Send`. Contract violations (dereferencing an empty
//! handle, writing past the end of a sequence) panic instead of returning an
//! error.

mod collections;
mod owned;
mod shared;

pub use collections::{Appender, OwnedDeque, OwnedMap, OwnedQueue, OwnedVec};
pub use owned::Owned;
pub use shared::{Shared, WeakRef};
