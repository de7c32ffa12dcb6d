// Run-time:
//   status: success

// A hand-built stand-in for evaluating `(print_atom (quote Hello_world!))`:
// the tokenizer, parser, and evaluator are not part of this crate, but the
// GC-visible postcondition an evaluator would produce -- push the argument,
// apply a native function over it, pop the result, leave nothing but the
// permanent roots behind -- is exercised directly.

extern crate gcl_gc;

use std::sync::atomic::{AtomicBool, Ordering};

use gcl_gc::ObjectRef;

static CALLED: AtomicBool = AtomicBool::new(false);

fn print_atom(data: ObjectRef) {
    CALLED.store(true, Ordering::SeqCst);
    println!("{}", gcl_gc::atom_str(data));
}

fn main() {
    gcl_gc::init_globals();

    let before = gcl_gc::object_count();

    let arg = gcl_gc::create_atom("Hello_world!");
    let mut function = gcl_gc::create_function(print_atom, arg);
    gcl_gc::push_root(&mut function);

    gcl_gc::operand_push(arg);
    let popped = gcl_gc::operand_pop();
    assert_eq!(popped, arg);

    gcl_gc::apply(function);
    assert!(CALLED.load(Ordering::SeqCst));

    gcl_gc::pop_root();
    gcl_gc::gc();

    assert_eq!(gcl_gc::object_count(), before);
}
