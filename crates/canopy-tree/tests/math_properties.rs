#![allow(clippy::unwrap_used)]

//! Property tests for the index algebra, quantified over tree sizes.

use canopy_tree::math::{
    copath, direct_path, left, level, parent, right, root, sibling, tree_size, LeafIndex,
    NodeIndex,
};
use proptest::prelude::*;

fn leaf_counts() -> impl Strategy<Value = u32> {
    (0u32..=10).prop_map(|exp| 1 << exp)
}

proptest! {
    #![proptest_config(ProptestConfig { max_global_rejects: 1 << 20, ..ProptestConfig::default() })]
    #[test]
    fn size_and_root(n in leaf_counts()) {
        prop_assert_eq!(tree_size(n), 2 * n - 1);
        // root(n) = 2^ceil(log2 n) - 1
        let expected = (n.next_power_of_two()) - 1;
        prop_assert_eq!(root(n).as_u32(), expected);
    }

    #[test]
    fn parent_of_both_children(n in leaf_counts(), raw in 0u32..2047) {
        prop_assume!(raw < tree_size(n));
        let node = NodeIndex::new(raw);
        prop_assume!(node != root(n));

        let p = parent(node, n).unwrap();
        prop_assert_eq!(parent(left(p).unwrap(), n).unwrap(), p);
        prop_assert_eq!(parent(right(p).unwrap(), n).unwrap(), p);
    }

    #[test]
    fn paths_have_equal_length_and_end_below_root(n in leaf_counts(), leaf in 0u32..1024) {
        prop_assume!(leaf < n);
        let leaf = LeafIndex::new(leaf);

        let dp = direct_path(leaf, n).unwrap();
        let cp = copath(leaf, n).unwrap();
        prop_assert_eq!(dp.len(), cp.len());

        if n > 1 {
            // The direct path ascends strictly in level and ends at the root.
            let mut last_level = level(leaf.node());
            for index in &dp {
                let l = level(index.node());
                prop_assert!(l > last_level);
                last_level = l;
            }
            prop_assert_eq!(dp.last().unwrap().node(), root(n));
            // The last copath entry is the root's other child.
            let last = *cp.last().unwrap();
            prop_assert_eq!(parent(last, n).unwrap(), root(n));
        } else {
            prop_assert!(dp.is_empty());
        }
    }

    #[test]
    fn copath_entries_are_siblings_of_the_path(n in leaf_counts(), leaf in 0u32..1024) {
        prop_assume!(leaf < n && n > 1);
        let leaf = LeafIndex::new(leaf);

        let dp = direct_path(leaf, n).unwrap();
        let cp = copath(leaf, n).unwrap();

        // First copath entry is the leaf's sibling; entry k is the sibling
        // of direct-path node k-1.
        prop_assert_eq!(cp[0], sibling(leaf.node(), n).unwrap());
        for k in 1..cp.len() {
            prop_assert_eq!(cp[k], sibling(dp[k - 1].node(), n).unwrap());
        }
    }
}
