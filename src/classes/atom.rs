// Copyright (c) 2019 King's College London created by the Software Development
// Team <http://soft-dev.org/>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, or the UPL-1.0 license
// <http://opensource.org/licenses/UPL> at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The `atom` class: a leaf value holding an owned, mutable string buffer.

use crate::object::{Class, ObjectHeader, ObjectRef};

pub static ATOM_CLASS: Class = Class {
    name: "atom",
    start_marking: atom_start_marking,
    mark_next: atom_mark_next,
    dispose: atom_dispose,
};

#[repr(C)]
pub(crate) struct Atom {
    pub(crate) header: ObjectHeader,
    chars: String,
}

impl Atom {
    pub(crate) fn new(chars: String) -> Self {
        Atom {
            header: ObjectHeader {
                next: None,
                marked: false,
                class: &ATOM_CLASS,
            },
            chars,
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.chars
    }
}

fn atom_start_marking(_obj: &mut ObjectRef, _parent: &mut Option<ObjectRef>) -> bool {
    false
}

fn atom_mark_next(_obj: &mut ObjectRef, _parent: &mut Option<ObjectRef>) -> bool {
    unreachable!("atom has no children; mark_next is never reached for it")
}

/// # Safety
/// `obj` must be of class `ATOM_CLASS` and about to be unlinked from the
/// heap list forever.
unsafe fn atom_dispose(obj: ObjectRef) {
    drop(Box::from_raw(obj.cast::<Atom>()));
}
