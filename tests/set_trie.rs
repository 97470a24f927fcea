use ecs_core::engine::error::SetTrieError;
use ecs_core::engine::set_trie::SetTrie;

fn sorted(mut found: Vec<&&'static str>) -> Vec<&'static str> {
    found.sort();
    found.into_iter().copied().collect()
}

fn sample() -> SetTrie<u16, &'static str> {
    let mut trie = SetTrie::new();
    trie.insert(&[1, 3], "{1,3}").unwrap();
    trie.insert(&[1, 2, 4], "{1,2,4}").unwrap();
    trie.insert(&[2], "{2}").unwrap();
    trie
}

#[test]
fn supersets_of_single_key() {
    let trie = sample();
    assert_eq!(sorted(trie.find_supersets(&[1])), vec!["{1,2,4}", "{1,3}"]);
    assert_eq!(sorted(trie.find_supersets(&[2])), vec!["{1,2,4}", "{2}"]);
    assert_eq!(sorted(trie.find_supersets(&[4])), vec!["{1,2,4}"]);
    assert!(trie.find_supersets(&[5]).is_empty());
}

#[test]
fn supersets_of_multiple_keys() {
    let trie = sample();
    assert_eq!(sorted(trie.find_supersets(&[1, 4])), vec!["{1,2,4}"]);
    assert_eq!(sorted(trie.find_supersets(&[2, 4])), vec!["{1,2,4}"]);
    assert!(trie.find_supersets(&[3, 4]).is_empty());
}

#[test]
fn empty_query_matches_everything() {
    let trie = sample();
    assert_eq!(sorted(trie.find_supersets(&[])), vec!["{1,2,4}", "{1,3}", "{2}"]);
    assert_eq!(trie.values().len(), 3);
    assert_eq!(trie.len(), 3);
}

#[test]
fn exact_lookup_ignores_prefixes() {
    let trie = sample();
    assert_eq!(trie.find_exact(&[1, 3]), Some(&"{1,3}"));
    assert_eq!(trie.find_exact(&[1]), None);
    assert_eq!(trie.find_exact(&[1, 2]), None);
    assert_eq!(trie.find_exact(&[7]), None);
}

#[test]
fn insert_rejects_duplicates_and_unsorted_sets() {
    let mut trie = sample();
    assert_eq!(trie.insert(&[1, 3], "again"), Err(SetTrieError::DuplicateKeySet));
    assert_eq!(trie.insert(&[3, 1], "backwards"), Err(SetTrieError::UnsortedKeySet));
    assert_eq!(trie.insert(&[2, 2], "repeated"), Err(SetTrieError::UnsortedKeySet));
    assert_eq!(trie.find_exact(&[1, 3]), Some(&"{1,3}"));
    assert_eq!(trie.len(), 3);
}

#[test]
fn remove_prunes_dead_branches_but_keeps_live_prefixes() {
    let mut trie = sample();
    trie.insert(&[1], "{1}").unwrap();

    assert_eq!(trie.remove(&[1, 2, 4]), Some("{1,2,4}"));
    assert_eq!(trie.find_exact(&[1, 2, 4]), None);
    assert_eq!(sorted(trie.find_supersets(&[1])), vec!["{1,3}", "{1}"]);
    assert_eq!(sorted(trie.find_supersets(&[4])), Vec::<&str>::new());

    assert_eq!(trie.remove(&[1]), Some("{1}"));
    assert_eq!(trie.find_exact(&[1, 3]), Some(&"{1,3}"));
    assert_eq!(trie.remove(&[1]), None);
    assert_eq!(trie.remove(&[9, 10]), None);
    assert_eq!(trie.len(), 2);
}

#[test]
fn empty_key_set_is_storable() {
    let mut trie = sample();
    trie.insert(&[], "{}").unwrap();
    assert_eq!(trie.find_exact(&[]), Some(&"{}"));
    assert_eq!(sorted(trie.find_supersets(&[2])), vec!["{1,2,4}", "{2}"]);
    assert_eq!(trie.find_supersets(&[]).len(), 4);
    assert_eq!(trie.remove(&[]), Some("{}"));
}

#[test]
fn visitor_rejects_unsorted_query() {
    let trie = sample();
    let mut count = 0;
    assert_eq!(
        trie.for_each_superset(&[4, 1], |_| count += 1),
        Err(SetTrieError::UnsortedKeySet)
    );
    assert_eq!(count, 0);
    assert!(trie.find_supersets(&[4, 1]).is_empty());
}
