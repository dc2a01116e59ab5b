//! Minimal-edit list diffing.
//!
//! Produces an ordered patch script turning one list into another with a
//! minimal number of insert/replace/remove operations. Patch indices are
//! positions in the *live* list at application time: applying the
//! patches sequentially, each index is valid against the list as already
//! mutated by the preceding patches.
//!
//! This is the primitive behind head reconciliation: attribute lists and
//! child-node lists are diffed by key and patched positionally.

/// One edit operation against a live list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListPatch<T> {
    /// Insert `item` before position `index`.
    Insert {
        /// Position in the live list.
        index: usize,
        /// The item to insert.
        item: T,
    },
    /// Replace the item at position `index` with `item`.
    Replace {
        /// Position in the live list.
        index: usize,
        /// The replacement item.
        item: T,
    },
    /// Remove the item at position `index`.
    Remove {
        /// Position in the live list.
        index: usize,
    },
}

/// Compute the minimal ordered edit script from `from` to `to`.
///
/// Items are compared by the key extracted with `key`; patched items are
/// cloned out of `to`. Equal-key items are left untouched, which is what
/// lets the reconciler keep already-loaded nodes alive.
pub fn list_diff<T, K, F>(from: &[T], to: &[T], key: F) -> Vec<ListPatch<T>>
where
    T: Clone,
    K: Eq,
    F: Fn(&T) -> K,
{
    let n = from.len();
    let m = to.len();
    let from_keys: Vec<K> = from.iter().map(&key).collect();
    let to_keys: Vec<K> = to.iter().map(&key).collect();

    // dist[i][j] = edit distance between from[i..] and to[j..]
    let mut dist = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..=n).rev() {
        for j in (0..=m).rev() {
            dist[i][j] = if i == n {
                m - j
            } else if j == m {
                n - i
            } else if from_keys[i] == to_keys[j] {
                dist[i + 1][j + 1]
            } else {
                1 + dist[i + 1][j + 1]
                    .min(dist[i + 1][j])
                    .min(dist[i][j + 1])
            };
        }
    }

    let mut patches = Vec::with_capacity(dist[0][0]);
    let (mut i, mut j) = (0, 0);
    // Position in the live list as it mutates under the patches so far.
    let mut pos = 0;
    while i < n || j < m {
        if i < n && j < m && from_keys[i] == to_keys[j] {
            i += 1;
            j += 1;
            pos += 1;
        } else if i < n && j < m && dist[i][j] == 1 + dist[i + 1][j + 1] {
            patches.push(ListPatch::Replace {
                index: pos,
                item: to[j].clone(),
            });
            i += 1;
            j += 1;
            pos += 1;
        } else if i < n && dist[i][j] == 1 + dist[i + 1][j] {
            patches.push(ListPatch::Remove { index: pos });
            i += 1;
        } else {
            patches.push(ListPatch::Insert {
                index: pos,
                item: to[j].clone(),
            });
            j += 1;
            pos += 1;
        }
    }
    patches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(from: &[&str], patches: &[ListPatch<&str>]) -> Vec<String> {
        let mut live: Vec<String> = from.iter().map(|s| s.to_string()).collect();
        for patch in patches {
            match patch {
                ListPatch::Insert { index, item } => live.insert(*index, item.to_string()),
                ListPatch::Replace { index, item } => live[*index] = item.to_string(),
                ListPatch::Remove { index } => {
                    live.remove(*index);
                }
            }
        }
        live
    }

    fn check(from: &[&str], to: &[&str], expected_ops: usize) {
        let patches = list_diff(from, to, |s| s.to_string());
        assert_eq!(patches.len(), expected_ops, "{from:?} -> {to:?}");
        assert_eq!(apply(from, &patches), to, "{from:?} -> {to:?}");
    }

    #[test]
    fn identical_lists_need_no_patches() {
        check(&["a", "b", "c"], &["a", "b", "c"], 0);
        check(&[], &[], 0);
    }

    #[test]
    fn pure_insertions() {
        check(&[], &["a", "b"], 2);
        check(&["b"], &["a", "b"], 1);
        check(&["a", "c"], &["a", "b", "c"], 1);
    }

    #[test]
    fn pure_deletions() {
        check(&["a", "b"], &[], 2);
        check(&["a", "b", "c"], &["a", "c"], 1);
    }

    #[test]
    fn substitution_is_one_op() {
        check(&["a", "x", "c"], &["a", "b", "c"], 1);
        let patches = list_diff(&["a", "x", "c"], &["a", "b", "c"], |s| s.to_string());
        assert!(matches!(patches[0], ListPatch::Replace { index: 1, .. }));
    }

    #[test]
    fn mixed_script_applies_in_order() {
        check(&["a", "b", "c", "d"], &["b", "c", "x", "e"], 3);
        check(&["x", "a", "b"], &["a", "b", "y"], 2);
    }

    #[test]
    fn reorder_costs_two() {
        // A swap is not expressible as a move, so it costs two edits
        check(&["a", "b"], &["b", "a"], 2);
    }

    #[test]
    fn indices_are_live_positions() {
        let patches = list_diff(&["a", "b"], &["x", "a", "b", "y"], |s| s.to_string());
        assert_eq!(
            patches,
            vec![
                ListPatch::Insert { index: 0, item: "x" },
                ListPatch::Insert { index: 3, item: "y" },
            ]
        );
    }
}
