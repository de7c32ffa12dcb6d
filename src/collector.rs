// Copyright (c) 2019 King's College London created by the Software Development
// Team <http://soft-dev.org/>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, or the UPL-1.0 license
// <http://opensource.org/licenses/UPL> at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The collector driver (`gc`), the allocator (`register_object`), and the
//! object-kind constructors/accessors built on top of them (spec.md §4.3,
//! §4.4, §4.6).
//!
//! Everything here hangs off one [`Collector`] instance: the heap list, the
//! root stack, the object cap, and the three permanent root cells
//! (`nil_root`, `operand_stack`, `cont_stack`). A `Collector` is always
//! handed out inside a `Box` (see [`Collector::new`]) so that the
//! self-referential addresses its root stack stores (pointers at its own
//! `nil_root`/`operand_stack`/`cont_stack` fields) stay valid for the
//! `Collector`'s entire lifetime, no matter how the `Box` handle itself is
//! moved afterwards.

use std::ptr::NonNull;

use crate::classes::atom::Atom;
use crate::classes::cons::Cons;
use crate::classes::function::{ApplyFn, FunctionObj};
use crate::classes::{ATOM_CLASS, CONS_CLASS, FUNCTION_CLASS, NIL_CLASS};
use crate::config::{DebugFlags, GcConfig};
use crate::error::{fatal, GcError};
use crate::heap::Heap;
use crate::mark;
use crate::object::{ObjectHeader, ObjectRef};
use crate::roots::RootStack;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum CollectorState {
    Ready,
    Marking,
    Sweeping,
}

/// The process-wide (or test-local) GC context: heap list, root stack,
/// object cap, and the permanent `nil`/`operand_stack`/`cont_stack` roots.
pub struct Collector {
    heap: Heap,
    roots: RootStack,
    cap: usize,
    pub debug_flags: DebugFlags,
    state: CollectorState,
    nil_root: ObjectRef,
    operand_stack: ObjectRef,
    cont_stack: ObjectRef,
}

impl Collector {
    /// Builds a fresh collector with its own heap, already past
    /// `init_globals()` (the `nil` singleton and the three permanent roots
    /// are installed before this returns).
    pub fn new(config: GcConfig) -> Box<Self> {
        let nil_header = Box::leak(Box::new(ObjectHeader {
            next: None,
            marked: false,
            class: &NIL_CLASS,
        }));
        // SAFETY: nil_header is a leaked, process-lifetime allocation; it is
        // deliberately never linked into `heap` (see `sweep_phase`), so it
        // is never disposed.
        let nil_root = unsafe { ObjectRef::from_raw(NonNull::from(&mut *nil_header)) };

        let mut collector = Box::new(Collector {
            heap: Heap::new(),
            roots: RootStack::new(),
            cap: config.object_cap,
            debug_flags: config.debug_flags,
            state: CollectorState::Ready,
            nil_root,
            operand_stack: nil_root,
            cont_stack: nil_root,
        });
        // `collector` is already boxed (a stable heap address) before we
        // take addresses of its own fields, so these self-pointers remain
        // valid for as long as the box lives.
        collector.roots.push(&mut collector.nil_root);
        collector.roots.push(&mut collector.operand_stack);
        collector.roots.push(&mut collector.cont_stack);
        collector
    }

    pub fn object_count(&self) -> usize {
        self.heap.len()
    }

    pub fn object_cap(&self) -> usize {
        self.cap
    }

    pub fn nil(&self) -> ObjectRef {
        self.nil_root
    }

    pub fn operand_stack(&self) -> ObjectRef {
        self.operand_stack
    }

    pub fn cont_stack(&self) -> ObjectRef {
        self.cont_stack
    }

    pub fn is_nil(&self, obj: ObjectRef) -> bool {
        std::ptr::eq(obj.class(), &NIL_CLASS)
    }

    // ---- root stack (spec.md §4.5) ----------------------------------

    pub fn push_root(&mut self, cell: &mut ObjectRef) {
        self.roots.push(cell);
    }

    pub fn try_pop_root(&mut self) -> Result<(), GcError> {
        self.roots.pop()
    }

    pub fn pop_root(&mut self) {
        self.try_pop_root().unwrap_or_else(|e| fatal(e))
    }

    pub fn try_set_root(&mut self, cell: &mut ObjectRef, value: ObjectRef) -> Result<(), GcError> {
        self.roots.set(cell, value)
    }

    pub fn set_root(&mut self, cell: &mut ObjectRef, value: ObjectRef) {
        self.try_set_root(cell, value).unwrap_or_else(|e| fatal(e))
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Scoped alternative to `push_root`/`pop_root`: roots `cell` for the
    /// returned guard's lifetime, un-rooting it automatically on drop.
    pub fn root<'a>(&'a mut self, cell: &'a mut ObjectRef) -> crate::roots::Root<'a> {
        crate::roots::Root::new(&mut self.roots, cell)
    }

    // ---- collector driver (spec.md §4.3) -----------------------------

    /// Forces a collection: mark every root, then sweep the heap.
    pub fn gc(&mut self) {
        debug_assert_eq!(
            self.state,
            CollectorState::Ready,
            "gc() re-entered; class callbacks must not trigger a collection"
        );

        if self.debug_flags.mark_phase {
            self.state = CollectorState::Marking;
            self.mark_phase();
        }
        if self.debug_flags.sweep_phase {
            self.state = CollectorState::Sweeping;
            self.sweep_phase();
        }
        self.state = CollectorState::Ready;
    }

    fn mark_phase(&mut self) {
        log::trace!("gc: marking from {} roots", self.roots.len());
        self.roots.for_each(mark::mark);
    }

    fn sweep_phase(&mut self) {
        let before = self.heap.len();
        self.heap.sweep(|obj| {
            let header = obj.header();
            if header.marked {
                header.marked = false;
                true
            } else {
                false
            }
        });
        log::trace!(
            "gc: swept {} objects, {} remain",
            before - self.heap.len(),
            self.heap.len()
        );
        // `nil` is never linked into `heap` (see `new`), so the generic
        // sweep above never visits it; restore its invariant by hand.
        self.nil_root.header().marked = false;
    }

    // ---- allocator (spec.md §4.4) ------------------------------------

    fn register_object<T>(&mut self, payload: Box<T>) -> Result<ObjectRef, GcError> {
        if self.heap.len() == self.cap {
            self.gc();
        }
        if self.heap.len() == self.cap {
            return Err(GcError::CapReachedAfterCollection);
        }
        let raw = Box::into_raw(payload).cast::<ObjectHeader>();
        // SAFETY: `T` always begins with an `ObjectHeader` (every class's
        // payload struct is `#[repr(C)]` with the header as its first
        // field), and we just obtained `raw` from `Box::into_raw`, so it is
        // non-null and uniquely owned.
        let obj = unsafe { ObjectRef::from_raw(NonNull::new_unchecked(raw)) };
        self.heap.push_front(obj);
        Ok(obj)
    }

    // ---- variant constructors (spec.md §6) ---------------------------

    pub fn create_nil(&self) -> ObjectRef {
        self.nil_root
    }

    pub fn create_cons(&mut self, head: ObjectRef, tail: ObjectRef) -> ObjectRef {
        let mut head = head;
        let mut tail = tail;
        self.roots.push(&mut head);
        self.roots.push(&mut tail);
        let obj = self
            .register_object(Box::new(Cons::new(head, tail)))
            .unwrap_or_else(|e| fatal(e));
        self.roots.pop().expect("balanced push above");
        self.roots.pop().expect("balanced push above");
        obj
    }

    pub fn create_atom(&mut self, chars: impl Into<String>) -> ObjectRef {
        self.register_object(Box::new(Atom::new(chars.into())))
            .unwrap_or_else(|e| fatal(e))
    }

    pub fn create_function(&mut self, apply: ApplyFn, data: ObjectRef) -> ObjectRef {
        let mut data = data;
        self.roots.push(&mut data);
        let obj = self
            .register_object(Box::new(FunctionObj::new(apply, data)))
            .unwrap_or_else(|e| fatal(e));
        self.roots.pop().expect("balanced push above");
        obj
    }

    // ---- accessors (spec.md §6) --------------------------------------

    pub fn try_destruct_cons(&self, obj: ObjectRef) -> Result<(ObjectRef, ObjectRef), GcError> {
        if !std::ptr::eq(obj.class(), &CONS_CLASS) {
            return Err(GcError::ClassMismatch {
                expected: "cons",
                found: obj.class().name,
            });
        }
        // SAFETY: class checked above.
        let cons = unsafe { &*obj.cast::<Cons>() };
        Ok((cons.head(), cons.tail()))
    }

    pub fn destruct_cons(&self, obj: ObjectRef) -> (ObjectRef, ObjectRef) {
        self.try_destruct_cons(obj).unwrap_or_else(|e| fatal(e))
    }

    /// Mutates an already-live cons in place (gcl.c's `parentCons->head =
    /// expr;`/`parentCons->tail = expr;` direct field writes, used by the
    /// interpreter to grow a list incrementally and to build cyclic
    /// structures). `value` must already be rooted by the caller if it has
    /// no other root, since this write alone does not root it.
    pub fn try_set_cons_head(&self, obj: ObjectRef, value: ObjectRef) -> Result<(), GcError> {
        if !std::ptr::eq(obj.class(), &CONS_CLASS) {
            return Err(GcError::ClassMismatch {
                expected: "cons",
                found: obj.class().name,
            });
        }
        // SAFETY: class checked above.
        unsafe { &mut *obj.cast::<Cons>() }.set_head(value);
        Ok(())
    }

    pub fn set_cons_head(&self, obj: ObjectRef, value: ObjectRef) {
        self.try_set_cons_head(obj, value).unwrap_or_else(|e| fatal(e))
    }

    pub fn try_set_cons_tail(&self, obj: ObjectRef, value: ObjectRef) -> Result<(), GcError> {
        if !std::ptr::eq(obj.class(), &CONS_CLASS) {
            return Err(GcError::ClassMismatch {
                expected: "cons",
                found: obj.class().name,
            });
        }
        // SAFETY: class checked above.
        unsafe { &mut *obj.cast::<Cons>() }.set_tail(value);
        Ok(())
    }

    pub fn set_cons_tail(&self, obj: ObjectRef, value: ObjectRef) {
        self.try_set_cons_tail(obj, value).unwrap_or_else(|e| fatal(e))
    }

    pub fn try_atom_eq(&self, a: ObjectRef, b: ObjectRef) -> Result<bool, GcError> {
        if !std::ptr::eq(a.class(), &ATOM_CLASS) {
            return Err(GcError::ClassMismatch {
                expected: "atom",
                found: a.class().name,
            });
        }
        if !std::ptr::eq(b.class(), &ATOM_CLASS) {
            return Err(GcError::ClassMismatch {
                expected: "atom",
                found: b.class().name,
            });
        }
        // SAFETY: both classes checked above.
        let (sa, sb) = unsafe { (&*a.cast::<Atom>(), &*b.cast::<Atom>()) };
        Ok(sa.as_str() == sb.as_str())
    }

    pub fn atom_eq(&self, a: ObjectRef, b: ObjectRef) -> bool {
        self.try_atom_eq(a, b).unwrap_or_else(|e| fatal(e))
    }

    pub fn atom_str(&self, obj: ObjectRef) -> &str {
        if !std::ptr::eq(obj.class(), &ATOM_CLASS) {
            fatal(GcError::ClassMismatch {
                expected: "atom",
                found: obj.class().name,
            });
        }
        // SAFETY: class checked above.
        unsafe { &*obj.cast::<Atom>() }.as_str()
    }

    /// Reads out `obj`'s apply callback and captured `data` without
    /// invoking it. Splitting this out of `apply` lets a caller sitting
    /// behind a lock (the global singleton in `lib.rs`) release that lock
    /// before calling the callback, which is free to re-enter the ABI
    /// (`create_cons`, `cont_push`, ...).
    pub fn try_apply_parts(&self, obj: ObjectRef) -> Result<(ApplyFn, ObjectRef), GcError> {
        if !std::ptr::eq(obj.class(), &FUNCTION_CLASS) {
            return Err(GcError::ClassMismatch {
                expected: "function",
                found: obj.class().name,
            });
        }
        // SAFETY: class checked above.
        let function = unsafe { &*obj.cast::<FunctionObj>() };
        Ok((function.apply(), function.data()))
    }

    pub fn apply_parts(&self, obj: ObjectRef) -> (ApplyFn, ObjectRef) {
        self.try_apply_parts(obj).unwrap_or_else(|e| fatal(e))
    }

    pub fn try_apply(&self, obj: ObjectRef) -> Result<(), GcError> {
        let (apply_fn, data) = self.try_apply_parts(obj)?;
        apply_fn(data);
        Ok(())
    }

    /// Calls `obj`'s apply callback directly. Safe to use on a `Collector`
    /// you own outright (tests, an embedder driving its own heap), but the
    /// global ABI in `lib.rs` must go through `apply_parts` instead so it
    /// can drop the singleton's mutex guard first — this method runs the
    /// callback while still holding `&self`, which re-entering through a
    /// lock-guarded singleton would deadlock on.
    pub fn apply(&self, obj: ObjectRef) {
        self.try_apply(obj).unwrap_or_else(|e| fatal(e))
    }

    // ---- association-list helpers (supplement; grounded in
    // original_source `assoc`/`map_cons`) --------------------------------

    pub fn try_assoc(
        &self,
        key: ObjectRef,
        alist: ObjectRef,
    ) -> Result<Option<ObjectRef>, GcError> {
        let mut cursor = alist;
        loop {
            if self.is_nil(cursor) {
                return Ok(None);
            }
            let (entry, rest) = self.try_destruct_cons(cursor)?;
            let (entry_key, entry_value) = self.try_destruct_cons(entry)?;
            if self.try_atom_eq(key, entry_key)? {
                return Ok(Some(entry_value));
            }
            cursor = rest;
        }
    }

    pub fn assoc(&self, key: ObjectRef, alist: ObjectRef) -> Option<ObjectRef> {
        self.try_assoc(key, alist).unwrap_or_else(|e| fatal(e))
    }

    /// Conses a new `(key . value)` entry onto the front of the rooted list
    /// `*alist_root`. `alist_root` must already be on the root stack
    /// (pushed by the caller, e.g. via [`Collector::push_root`]).
    pub fn bind(&mut self, key: ObjectRef, value: ObjectRef, alist_root: &mut ObjectRef) {
        let mut entry = self.create_cons(key, value);
        self.roots.push(&mut entry);
        let old = *alist_root;
        let cons = self.create_cons(entry, old);
        self.roots.pop().expect("balanced push above");
        self.try_set_root(alist_root, cons)
            .unwrap_or_else(|e| fatal(e));
    }

    // ---- operand / continuation stacks (spec.md §3) -------------------

    pub fn operand_push(&mut self, value: ObjectRef) {
        let mut value = value;
        self.roots.push(&mut value);
        let old_top = self.operand_stack;
        let cons = self.create_cons(value, old_top);
        self.roots.pop().expect("balanced push above");
        self.roots
            .set(&mut self.operand_stack, cons)
            .expect("operand_stack is a permanent root");
    }

    pub fn try_operand_pop(&mut self) -> Result<ObjectRef, GcError> {
        let top = self.operand_stack;
        let (value, rest) = self.try_destruct_cons(top)?;
        self.roots
            .set(&mut self.operand_stack, rest)
            .expect("operand_stack is a permanent root");
        Ok(value)
    }

    pub fn operand_pop(&mut self) -> ObjectRef {
        self.try_operand_pop().unwrap_or_else(|e| fatal(e))
    }

    pub fn cont_push(&mut self, value: ObjectRef) {
        let mut value = value;
        self.roots.push(&mut value);
        let old_top = self.cont_stack;
        let cons = self.create_cons(value, old_top);
        self.roots.pop().expect("balanced push above");
        self.roots
            .set(&mut self.cont_stack, cons)
            .expect("cont_stack is a permanent root");
    }

    pub fn try_cont_pop(&mut self) -> Result<ObjectRef, GcError> {
        let top = self.cont_stack;
        let (value, rest) = self.try_destruct_cons(top)?;
        self.roots
            .set(&mut self.cont_stack, rest)
            .expect("cont_stack is a permanent root");
        Ok(value)
    }

    pub fn cont_pop(&mut self) -> ObjectRef {
        self.try_cont_pop().unwrap_or_else(|e| fatal(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn collector() -> Box<Collector> {
        Collector::new(GcConfig::default())
    }

    #[test]
    fn lone_atom_is_collected_once_unrooted() {
        let mut gc = collector();
        let before = gc.object_count();

        let mut a = gc.create_atom("A");
        gc.push_root(&mut a);
        gc.pop_root();
        gc.gc();

        assert_eq!(gc.object_count(), before);
    }

    #[test]
    fn rooted_chain_survives_collection() {
        let mut gc = collector();
        let nil = gc.nil();

        let mut list = gc.create_cons(gc.create_atom("c"), nil);
        list = gc.create_cons(gc.create_atom("b"), list);
        list = gc.create_cons(gc.create_atom("a"), list);
        gc.push_root(&mut list);

        let before = gc.object_count();
        gc.gc();
        assert_eq!(gc.object_count(), before);

        let (head, _) = gc.destruct_cons(list);
        assert_eq!(gc.atom_str(head), "a");

        gc.pop_root();
    }

    #[test]
    fn cyclic_graph_survives_and_terminates() {
        let mut gc = collector();
        let nil = gc.nil();

        let mut c1 = gc.create_cons(nil, nil);
        gc.push_root(&mut c1);
        let c2 = gc.create_cons(c1, nil);
        gc.set_cons_head(c1, c2);

        let before = gc.object_count();
        gc.gc();
        assert_eq!(gc.object_count(), before);

        let (head1, _) = gc.destruct_cons(c1);
        let (head2, _) = gc.destruct_cons(c2);
        assert_eq!(head1, c2);
        assert_eq!(head2, c1);

        gc.pop_root();
    }

    #[test]
    fn unreachable_unrooted_garbage_is_swept() {
        let mut gc = collector();
        let nil = gc.nil();
        for _ in 0..100 {
            gc.create_cons(nil, nil);
        }
        assert_eq!(gc.object_count(), 100);
        gc.gc();
        // `nil` is never linked into the heap list (it is a static
        // singleton, not a `register_object`-allocated object), so a fully
        // garbage-collected heap with no other roots has a count of 0.
        assert_eq!(gc.object_count(), 0);
    }

    #[test]
    fn repeated_gc_is_idempotent_on_a_stable_heap() {
        let mut gc = collector();
        let mut a = gc.create_atom("stable");
        gc.push_root(&mut a);

        gc.gc();
        let after_first = gc.object_count();
        gc.gc();
        assert_eq!(gc.object_count(), after_first);

        gc.pop_root();
    }

    #[test]
    fn allocation_at_cap_triggers_collection_not_failure() {
        let cap = 16;
        let mut gc = Collector::new(GcConfig::new().object_cap(cap));
        let nil = gc.nil();

        for _ in 0..cap {
            gc.create_cons(nil, nil);
        }
        assert_eq!(gc.object_count(), cap);

        let mut last = gc.create_cons(nil, nil);
        gc.push_root(&mut last);
        assert_eq!(gc.object_count(), 1);

        gc.pop_root();
    }

    #[test]
    fn scoped_root_guard_pops_on_drop() {
        let mut gc = collector();
        let root_count_before = gc.root_count();
        let mut cell = gc.create_atom("scoped");
        {
            let _guard = gc.root(&mut cell);
            assert_eq!(gc.root_count(), root_count_before + 1);
        }
        assert_eq!(gc.root_count(), root_count_before);
    }

    #[test]
    fn assoc_finds_bound_key_and_misses_unbound_one() {
        let mut gc = collector();
        let mut alist = gc.nil();
        gc.push_root(&mut alist);

        let key = gc.create_atom("name");
        let value = gc.create_atom("gcl");
        gc.bind(key, value, &mut alist);

        let found = gc.assoc(key, alist).expect("key should be bound");
        assert!(gc.atom_eq(found, value));

        let missing = gc.create_atom("missing");
        assert!(gc.assoc(missing, alist).is_none());

        gc.pop_root();
    }

    #[test]
    fn operand_stack_push_pop_round_trips() {
        let mut gc = collector();
        let a = gc.create_atom("x");
        gc.operand_push(a);
        let popped = gc.operand_pop();
        assert_eq!(popped, a);
    }

    #[test]
    fn cont_stack_push_pop_round_trips() {
        let mut gc = collector();
        let a = gc.create_atom("k");
        gc.cont_push(a);
        let popped = gc.cont_pop();
        assert_eq!(popped, a);
    }
}
