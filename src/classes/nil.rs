// Copyright (c) 2019 King's College London created by the Software Development
// Team <http://soft-dev.org/>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, or the UPL-1.0 license
// <http://opensource.org/licenses/UPL> at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The `nil` class: the empty-list singleton (spec.md §4.6).
//!
//! `nil` has no children, so `start_marking` always returns `false`.
//! `dispose` is never called: `nil` is permanently rooted via `nil_root`
//! and is never linked into the swept heap list (see
//! [`Collector::new`](crate::collector::Collector::new)).

use crate::object::{Class, ObjectRef};

pub static NIL_CLASS: Class = Class {
    name: "nil",
    start_marking: nil_start_marking,
    mark_next: nil_mark_next,
    dispose: nil_dispose,
};

fn nil_start_marking(_obj: &mut ObjectRef, _parent: &mut Option<ObjectRef>) -> bool {
    false
}

fn nil_mark_next(_obj: &mut ObjectRef, _parent: &mut Option<ObjectRef>) -> bool {
    unreachable!("nil has no children; mark_next is never reached for it")
}

/// # Safety
/// Never actually called: `nil` is not part of the swept heap list.
unsafe fn nil_dispose(_obj: ObjectRef) {
    unreachable!("nil is permanently rooted and is never swept")
}
