// Run-time:
//   status: success

extern crate gcl_gc;

fn main() {
    gcl_gc::init_globals();

    let nil = gcl_gc::nil();

    // Build two half-formed cells, then tie the knot with an in-place
    // mutation: c1.head = c2, c2.head = c1, both tails nil. Only c1 is
    // rooted.
    let mut c1 = gcl_gc::create_cons(nil, nil);
    gcl_gc::push_root(&mut c1);
    let c2 = gcl_gc::create_cons(c1, nil);
    gcl_gc::set_cons_head(c1, c2);

    let before = gcl_gc::object_count();
    let (pre_head1, pre_tail1) = gcl_gc::destruct_cons(c1);
    let (pre_head2, pre_tail2) = gcl_gc::destruct_cons(c2);

    gcl_gc::gc();
    assert_eq!(gcl_gc::object_count(), before);

    let (head1, tail1) = gcl_gc::destruct_cons(c1);
    let (head2, tail2) = gcl_gc::destruct_cons(c2);
    assert_eq!(head1, pre_head1);
    assert_eq!(tail1, pre_tail1);
    assert_eq!(head2, pre_head2);
    assert_eq!(tail2, pre_tail2);
    assert_eq!(head1, c2);
    assert_eq!(head2, c1);
    assert!(gcl_gc::is_nil(tail1));
    assert!(gcl_gc::is_nil(tail2));

    gcl_gc::pop_root();
}
