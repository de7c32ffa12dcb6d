// Copyright (c) 2019 King's College London created by the Software Development
// Team <http://soft-dev.org/>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, or the UPL-1.0 license
// <http://opensource.org/licenses/UPL> at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The `function` class: a callable bundling a native apply callback with a
//! captured, GC-managed `data` reference (spec.md §4.6).
//!
//! Single-child protocol: `data` is the one marked child; `apply` is an
//! opaque native code pointer the collector never inspects. Just like
//! [`Cons`](crate::classes::cons::Cons), `data` is `Option<ObjectRef>`
//! because it transiently holds the reversed parent link (possibly `None`)
//! during marking.

use crate::object::{Class, ObjectHeader, ObjectRef};

/// A native callback a `function` object wraps. The collector never calls
/// this itself; it is invoked by the host interpreter via [`apply`].
pub type ApplyFn = fn(data: ObjectRef);

pub static FUNCTION_CLASS: Class = Class {
    name: "function",
    start_marking: function_start_marking,
    mark_next: function_mark_next,
    dispose: function_dispose,
};

#[repr(C)]
pub(crate) struct FunctionObj {
    pub(crate) header: ObjectHeader,
    apply: ApplyFn,
    data: Option<ObjectRef>,
}

impl FunctionObj {
    pub(crate) fn new(apply: ApplyFn, data: ObjectRef) -> Self {
        FunctionObj {
            header: ObjectHeader {
                next: None,
                marked: false,
                class: &FUNCTION_CLASS,
            },
            apply,
            data: Some(data),
        }
    }

    pub(crate) fn apply(&self) -> ApplyFn {
        self.apply
    }

    pub(crate) fn data(&self) -> ObjectRef {
        self.data.expect("function.data populated outside marking")
    }
}

fn function_start_marking(obj: &mut ObjectRef, parent: &mut Option<ObjectRef>) -> bool {
    let this = *obj;
    // SAFETY: caller (the marker) only invokes this through `Class::start_marking`
    // for objects already known to be of class `FUNCTION_CLASS`.
    let function = unsafe { &mut *this.cast::<FunctionObj>() };
    let data = function
        .data
        .take()
        .expect("function.data populated before marking");
    function.data = *parent;
    *obj = data;
    *parent = Some(this);
    true
}

fn function_mark_next(obj: &mut ObjectRef, parent: &mut Option<ObjectRef>) -> bool {
    let p = parent.expect("function_mark_next is only reached with a parent on the stack");
    let function = unsafe { &mut *p.cast::<FunctionObj>() };
    *parent = function.data.take();
    function.data = Some(*obj);
    *obj = p;
    false
}

/// # Safety
/// `obj` must be of class `FUNCTION_CLASS` and about to be unlinked from
/// the heap list forever.
unsafe fn function_dispose(obj: ObjectRef) {
    drop(Box::from_raw(obj.cast::<FunctionObj>()));
}
