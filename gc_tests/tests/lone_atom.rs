// Run-time:
//   status: success

extern crate gcl_gc;

fn main() {
    gcl_gc::init_globals();

    let before = gcl_gc::object_count();

    let mut a = gcl_gc::create_atom("A");
    gcl_gc::push_root(&mut a);
    gcl_gc::pop_root();

    gcl_gc::gc();

    assert_eq!(gcl_gc::object_count(), before);
    assert!(gcl_gc::is_nil(gcl_gc::nil()));
}
