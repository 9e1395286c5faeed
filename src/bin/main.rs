use cordyceps_avl::AvlMap;

fn main() {
    // `RUST_LOG=debug` shows rotation decisions; `trace` adds the tree
    // structure after each operation.
    env_logger::init();

    let mut map: AvlMap<u32, &str> = AvlMap::new();

    for (key, name) in [
        (3, "three"),
        (1, "one"),
        (4, "four"),
        (1, "one again"),
        (5, "five"),
        (9, "nine"),
        (2, "two"),
        (6, "six"),
    ] {
        map.insert(key, name);
    }

    println!("{:?}", map.iter().collect::<Vec<_>>());

    map.remove(&4);
    println!("{:?}", map.iter().collect::<Vec<_>>());

    let min = map.pop_first().unwrap();
    assert_eq!(min, (1, "one again"));

    println!("{:?}", map.iter().collect::<Vec<_>>());
}
