//! End-to-end tests for the symbol table and its owner types.

use statname::{Error, NameList, NameStorageSet, SymbolTable, MAX_LIST_SIZE};

#[test]
fn test_token_sharing_accounting() {
    let table = SymbolTable::new();

    let first = table.encode("a.b.c").unwrap();
    assert_eq!(table.num_symbols(), 3);

    // "a" and "b" are reused; only "d" is new.
    let second = table.encode("a.b.d").unwrap();
    assert_eq!(table.num_symbols(), 4);

    first.free(&table);
    assert_eq!(table.num_symbols(), 3);
    second.free(&table);
    assert_eq!(table.num_symbols(), 0);
}

#[test]
fn test_independent_encodes_compare_equal() {
    let table = SymbolTable::new();
    let h1 = table.encode("x").unwrap();
    let h2 = table.encode("x").unwrap();

    assert_eq!(h1.name(), h2.name());
    assert_eq!(h1.name().hash_value(), h2.name().hash_value());

    h1.free(&table);
    assert_eq!(table.to_string(h2.name()), "x");
    h2.free(&table);
    assert_eq!(table.num_symbols(), 0);
}

#[test]
fn test_distinct_names_differ() {
    let table = SymbolTable::new();
    let a = table.encode("a.b").unwrap();
    let b = table.encode("a.c").unwrap();
    assert_ne!(a.name(), b.name());
    a.free(&table);
    b.free(&table);
}

#[test]
fn test_less_than_matches_decoded_order() {
    let table = SymbolTable::new();
    // Interned in an order unrelated to string order, so symbol values
    // disagree with token order.
    let raw = [
        "zz", "alpha.beta", "alpha.gamma", "alpha", "m.n.o", "m.n", "zz.a",
    ];
    let storages: Vec<_> = raw.iter().map(|s| table.encode(s).unwrap()).collect();

    let mut by_table: Vec<usize> = (0..raw.len()).collect();
    by_table.sort_by(|&i, &j| {
        if table.less_than(storages[i].name(), storages[j].name()) {
            std::cmp::Ordering::Less
        } else if table.less_than(storages[j].name(), storages[i].name()) {
            std::cmp::Ordering::Greater
        } else {
            std::cmp::Ordering::Equal
        }
    });

    let mut by_string: Vec<usize> = (0..raw.len()).collect();
    by_string.sort_by_key(|&i| raw[i].split('.').collect::<Vec<_>>());

    assert_eq!(by_table, by_string);
    for storage in storages {
        storage.free(&table);
    }
}

#[test]
fn test_join_round_trips() {
    let table = SymbolTable::new();
    let a = table.encode("cluster.membership").unwrap();
    let b = table.encode("healthy").unwrap();

    let joined = table.join(&[a.name(), b.name()]).unwrap();
    assert_eq!(table.to_string(joined.name()), "cluster.membership.healthy");

    a.free(&table);
    b.free(&table);
    joined.free(&table);
    assert_eq!(table.num_symbols(), 0);
}

#[test]
fn test_list_round_trips() {
    let table = SymbolTable::new();
    let mut list = NameList::new();
    table
        .populate_list(&["one", "two", "three"], &mut list)
        .unwrap();

    let decoded: Vec<String> = list.iter().map(|n| table.to_string(n)).collect();
    assert_eq!(decoded, ["one", "two", "three"]);

    list.free(&table);
    assert_eq!(table.num_symbols(), 0);
}

#[test]
fn test_list_element_cap() {
    let table = SymbolTable::new();
    let names: Vec<String> = (0..=MAX_LIST_SIZE).map(|i| format!("n{i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();

    let mut list = NameList::new();
    table.populate_list(&refs[..MAX_LIST_SIZE], &mut list).unwrap();
    assert_eq!(list.iter().len(), MAX_LIST_SIZE);
    list.free(&table);

    let err = table.populate_list(&refs, &mut list).unwrap_err();
    assert_eq!(err, Error::ListTooLong { count: MAX_LIST_SIZE + 1 });
    assert!(!list.is_populated());
    assert_eq!(table.num_symbols(), 0);
}

#[test]
fn test_failed_list_population_rolls_back() {
    let table = SymbolTable::new();
    let preexisting = table.encode("keep.me").unwrap();
    let count = table.num_symbols();

    let too_long = vec!["a"; 65_536].join(".");
    let mut list = NameList::new();
    let err = table
        .populate_list(&["keep.other", &too_long], &mut list)
        .unwrap_err();
    assert_eq!(err, Error::NameTooLong { size: 65_536 });

    // Only the names from before the failed call remain interned.
    assert!(!list.is_populated());
    assert_eq!(table.num_symbols(), count);
    preexisting.free(&table);
    assert_eq!(table.num_symbols(), 0);
}

#[test]
fn test_storage_set_lookup_and_release() {
    let table = SymbolTable::new();
    let mut set = NameStorageSet::new();
    for name in ["http.rq.total", "http.rq.active", "tcp.cx.total"] {
        set.insert(table.encode(name).unwrap()).unwrap();
    }

    let probe = table.encode("http.rq.active").unwrap();
    assert!(set.contains(probe.name()));
    assert!(set.get(probe.name()).is_some());
    probe.free(&table);

    let miss = table.encode("http.rq.retry").unwrap();
    assert!(!set.contains(miss.name()));
    miss.free(&table);

    set.free(&table);
    assert_eq!(table.num_symbols(), 0);
}

#[test]
fn test_inc_ref_count_then_free_is_identity() {
    let table = SymbolTable::new();
    let held = table.encode("a.b").unwrap();
    let before = table.num_symbols();

    table.inc_ref_count(held.name());
    table.free(held.name());
    assert_eq!(table.num_symbols(), before);

    assert_eq!(table.to_string(held.name()), "a.b");
    held.free(&table);
    assert_eq!(table.num_symbols(), 0);
}
