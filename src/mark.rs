// Copyright (c) 2019 King's College London created by the Software Development
// Team <http://soft-dev.org/>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, or the UPL-1.0 license
// <http://opensource.org/licenses/UPL> at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The Schorr–Waite marker.
//!
//! `mark` traverses the object graph reachable from a single root using no
//! auxiliary stack: the DFS parent chain is reconstructed on the fly via
//! pointer reversal, which each [`Class`](crate::object::Class)'s
//! `start_marking`/`mark_next` callbacks implement by rewriting the
//! traversed object's own child fields. This is a direct transliteration of
//! the two-state machine:
//!
//! ```text
//!   START(obj, parent):
//!     if obj.marked: goto ADVANCE(obj, parent)
//!     obj.marked ← true
//!     if start_marking(&obj,&parent): goto START(obj, parent)
//!     else:                           goto ADVANCE(obj, parent)
//!
//!   ADVANCE(obj, parent):
//!     if parent == null: DONE
//!     if mark_next(&obj,&parent): goto START(obj, parent)
//!     else:                       goto ADVANCE(obj, parent)
//! ```

use crate::object::ObjectRef;

/// Marks every object reachable from `root`. Idempotent: marking an
/// already-marked root is a no-op (the `START` state short-circuits to
/// `ADVANCE` the moment it sees `marked == true`, which is also what
/// guarantees termination on cyclic graphs).
pub(crate) fn mark(root: ObjectRef) {
    let mut obj = root;
    let mut parent: Option<ObjectRef> = None;

    'start: loop {
        if !obj.header().marked {
            obj.header().marked = true;
            let start_marking = obj.class().start_marking;
            if start_marking(&mut obj, &mut parent) {
                continue 'start;
            }
            // Leaf: start_marking left obj/parent untouched. Fall through
            // to ADVANCE with the current (obj, parent) pair.
        }

        loop {
            let Some(p) = parent else {
                return; // DONE
            };
            let mark_next = p.class().mark_next;
            if mark_next(&mut obj, &mut parent) {
                continue 'start;
            }
            // mark_next's false branch has rewritten obj := p and
            // parent := p's grandparent (possibly None); loop to
            // re-check the new parent.
        }
    }
}
