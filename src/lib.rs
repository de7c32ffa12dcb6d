// Copyright (c) 2019 King's College London created by the Software Development
// Team <http://soft-dev.org/>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, or the UPL-1.0 license
// <http://opensource.org/licenses/UPL> at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A Schorr–Waite tracing garbage collector for a miniature Lisp-like heap.
//!
//! This crate is the collector core of a small "Garbage-Collected Language"
//! interpreter: a mark-sweep collector that traces the live object graph
//! with the Schorr–Waite pointer-reversal algorithm (constant auxiliary
//! memory, no recursion, no shadow stack) driven by a mutator-maintained
//! dynamic root stack. The tokenizer, parser, REPL, and built-in evaluator
//! functions of such an interpreter are intentionally not part of this
//! crate; see `README.md`/`DESIGN.md` for the split.
//!
//! Two layers are exposed:
//!
//! - [`Collector`], an owned GC context you construct and drive directly —
//!   convenient for tests and for embedding multiple independent heaps.
//! - A process-wide singleton reached through the free functions in this
//!   module ([`init_globals`], [`register_object`]-style constructors,
//!   [`push_root`]/[`pop_root`]/[`set_root`], [`gc`]), matching the literal
//!   ABI spec.md §6 describes for a host interpreter written against a
//!   single global heap.

mod classes;
mod collector;
mod config;
mod error;
mod heap;
mod mark;
mod object;
mod roots;

pub use classes::function::ApplyFn;
pub use classes::{ATOM_CLASS, CONS_CLASS, FUNCTION_CLASS, NIL_CLASS};
pub use collector::Collector;
pub use config::{DebugFlags, GcConfig, DEFAULT_OBJECT_CAP};
pub use error::GcError;
pub use object::{Class, ObjectRef};
pub use roots::Root;

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, MutexGuard};

static GLOBAL: OnceCell<Mutex<Box<Collector>>> = OnceCell::new();

fn global() -> &'static Mutex<Box<Collector>> {
    GLOBAL
        .get()
        .expect("init_globals() must be called before any other call")
}

fn lock() -> MutexGuard<'static, Box<Collector>> {
    global().lock()
}

/// One-time initialization (spec.md §6): sets up the `nil` singleton and
/// the permanent roots for `nil_root`, `operand_stack`, and `cont_stack`.
/// Must be called before any other function in this module. Calling it
/// twice is a usage error.
pub fn init_globals() {
    init_globals_with(GcConfig::default())
}

/// As [`init_globals`], but with an explicit [`GcConfig`] (answers spec.md
/// §9's open question about the object cap being a construction parameter).
pub fn init_globals_with(config: GcConfig) {
    GLOBAL
        .set(Mutex::new(Collector::new(config)))
        .unwrap_or_else(|_| panic!("init_globals() called more than once"));
}

pub fn register_object_cap() -> usize {
    lock().object_cap()
}

pub fn object_count() -> usize {
    lock().object_count()
}

pub fn root_count() -> usize {
    lock().root_count()
}

pub fn gc() {
    lock().gc()
}

pub fn push_root(cell: &mut ObjectRef) {
    lock().push_root(cell)
}

pub fn pop_root() {
    lock().pop_root()
}

pub fn set_root(cell: &mut ObjectRef, value: ObjectRef) {
    lock().set_root(cell, value)
}

pub fn create_nil() -> ObjectRef {
    lock().create_nil()
}

pub fn create_cons(head: ObjectRef, tail: ObjectRef) -> ObjectRef {
    lock().create_cons(head, tail)
}

pub fn create_atom(chars: impl Into<String>) -> ObjectRef {
    lock().create_atom(chars)
}

pub fn create_function(apply: ApplyFn, data: ObjectRef) -> ObjectRef {
    lock().create_function(apply, data)
}

pub fn destruct_cons(obj: ObjectRef) -> (ObjectRef, ObjectRef) {
    lock().destruct_cons(obj)
}

pub fn set_cons_head(obj: ObjectRef, value: ObjectRef) {
    lock().set_cons_head(obj, value)
}

pub fn set_cons_tail(obj: ObjectRef, value: ObjectRef) {
    lock().set_cons_tail(obj, value)
}

pub fn atom_eq(a: ObjectRef, b: ObjectRef) -> bool {
    lock().atom_eq(a, b)
}

/// Owned copy of an atom's contents. `Collector::atom_str` returns a `&str`
/// borrowed from the object itself, which is fine for direct `Collector`
/// callers but cannot be re-exported here unchanged: the borrow would be
/// tied to the `MutexGuard` returned by `lock()`, which is dropped the
/// moment this function returns.
pub fn atom_str(obj: ObjectRef) -> String {
    lock().atom_str(obj).to_owned()
}

pub fn apply(obj: ObjectRef) {
    let (apply_fn, data) = lock().apply_parts(obj);
    apply_fn(data)
}

pub fn assoc(key: ObjectRef, alist: ObjectRef) -> Option<ObjectRef> {
    lock().assoc(key, alist)
}

pub fn bind(key: ObjectRef, value: ObjectRef, alist_root: &mut ObjectRef) {
    lock().bind(key, value, alist_root)
}

pub fn operand_push(value: ObjectRef) {
    lock().operand_push(value)
}

pub fn operand_pop() -> ObjectRef {
    lock().operand_pop()
}

pub fn cont_push(value: ObjectRef) {
    lock().cont_push(value)
}

pub fn cont_pop() -> ObjectRef {
    lock().cont_pop()
}

pub fn nil() -> ObjectRef {
    lock().nil()
}

pub fn is_nil(obj: ObjectRef) -> bool {
    lock().is_nil(obj)
}
