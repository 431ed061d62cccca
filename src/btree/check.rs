//! # Integrity Verification
//!
//! [`BPlusTree::check_integrity`] walks the whole file and verifies the
//! structural invariants the engine relies on:
//!
//! 1. keys strictly ascending within every node, and within the bounds
//!    its ancestors' separators impose
//! 2. node occupancy within capacity (interior nodes non-empty)
//! 3. all leaves at the same depth
//! 4. the leaf chain visits exactly the tree's leaves, left to right, with
//!    `prev`/`next` mirroring and ascending keys across the whole chain
//! 5. the metadata record count equals the sum of leaf occupancies
//! 6. the free list stays within the allocation watermark, contains no
//!    cycle, never contains page 0, and is disjoint from the live tree
//!
//! The walk is read-only and proportional to the file's live pages. It is
//! meant for tests, the driver's `check` command, and post-incident
//! debugging, not for the hot path.

use eyre::{bail, ensure, Result};
use hashbrown::HashSet;

use super::interior::InteriorNode;
use super::leaf::LeafNode;
use super::tree::BPlusTree;
use super::PageType;
use crate::config::{INTERIOR_MAX_KEYS, INVALID_PAGE, LEAF_MAX_KEYS};

/// Everything the recursive walk learns about one subtree.
struct SubtreeReport {
    /// Depth of every leaf below this node (0 for a leaf itself).
    leaf_depth: usize,
    /// Live records in this subtree.
    records: u64,
    /// Leaf page ids in key order.
    leaves: Vec<u32>,
}

impl BPlusTree {
    /// Verifies every structural invariant of the index. Returns the first
    /// violation found as an error.
    pub fn check_integrity(&self) -> Result<()> {
        let meta = self.pager().meta()?;
        let num_pages = meta.num_pages();
        let root = meta.root_page_id();
        let num_records = meta.num_records();
        let free_head = meta.free_list_head();

        ensure!(num_pages >= 1, "allocation watermark below 1");

        let mut live = HashSet::new();

        if root == INVALID_PAGE {
            ensure!(
                num_records == 0,
                "empty tree reports {} records",
                num_records
            );
        } else {
            let report = self.walk(root, None, None, num_pages, &mut live)?;

            ensure!(
                report.records == num_records as u64,
                "metadata records {} != {} records found in leaves",
                num_records,
                report.records
            );

            self.check_leaf_chain(&report.leaves)?;
        }

        self.check_free_list(free_head, num_pages, &live)?;

        Ok(())
    }

    fn walk(
        &self,
        page_id: u32,
        lower: Option<i32>,
        upper: Option<i32>,
        num_pages: u32,
        live: &mut HashSet<u32>,
    ) -> Result<SubtreeReport> {
        ensure!(page_id != INVALID_PAGE, "INVALID_PAGE reachable from root");
        ensure!(page_id != 0, "metadata page reachable from root");
        ensure!(
            page_id < num_pages,
            "page {} beyond allocation watermark {}",
            page_id,
            num_pages
        );
        ensure!(
            live.insert(page_id),
            "page {} reachable from root twice",
            page_id
        );

        let page = self.pager().page(page_id)?;
        match PageType::from_byte(page[0]) {
            PageType::Leaf => {
                let leaf = LeafNode::from_page(page)?;
                let n = leaf.num_keys();
                ensure!(
                    n <= LEAF_MAX_KEYS,
                    "leaf {} holds {} keys (max {})",
                    page_id,
                    n,
                    LEAF_MAX_KEYS
                );

                for i in 0..n {
                    let key = leaf.key_at(i);
                    if i > 0 {
                        ensure!(
                            leaf.key_at(i - 1) < key,
                            "leaf {} keys not strictly ascending at index {}",
                            page_id,
                            i
                        );
                    }
                    if let Some(lo) = lower {
                        ensure!(
                            key >= lo,
                            "leaf {} key {} below separator bound {}",
                            page_id,
                            key,
                            lo
                        );
                    }
                    if let Some(hi) = upper {
                        ensure!(
                            key < hi,
                            "leaf {} key {} not below separator bound {}",
                            page_id,
                            key,
                            hi
                        );
                    }
                }

                Ok(SubtreeReport {
                    leaf_depth: 0,
                    records: n as u64,
                    leaves: vec![page_id],
                })
            }
            PageType::Interior => {
                let node = InteriorNode::from_page(page)?;
                let n = node.num_keys();
                ensure!(n >= 1, "interior {} has no keys", page_id);
                ensure!(
                    n <= INTERIOR_MAX_KEYS,
                    "interior {} holds {} keys (max {})",
                    page_id,
                    n,
                    INTERIOR_MAX_KEYS
                );

                for i in 0..n {
                    let key = node.key_at(i);
                    if i > 0 {
                        ensure!(
                            node.key_at(i - 1) < key,
                            "interior {} keys not strictly ascending at index {}",
                            page_id,
                            i
                        );
                    }
                    if let Some(lo) = lower {
                        ensure!(
                            key >= lo,
                            "interior {} key {} below separator bound {}",
                            page_id,
                            key,
                            lo
                        );
                    }
                    if let Some(hi) = upper {
                        ensure!(
                            key < hi,
                            "interior {} key {} not below separator bound {}",
                            page_id,
                            key,
                            hi
                        );
                    }
                }

                let first_upper = Some(node.key_at(0));
                let mut report = self.walk(node.child_at(0), lower, first_upper, num_pages, live)?;

                for i in 1..=n {
                    let child_lower = Some(node.key_at(i - 1));
                    let child_upper = if i == n { upper } else { Some(node.key_at(i)) };
                    let child =
                        self.walk(node.child_at(i), child_lower, child_upper, num_pages, live)?;

                    ensure!(
                        report.leaf_depth == child.leaf_depth,
                        "leaves under interior {} at unequal depths ({} vs {})",
                        page_id,
                        report.leaf_depth,
                        child.leaf_depth
                    );
                    report.records += child.records;
                    report.leaves.extend(child.leaves);
                }

                report.leaf_depth += 1;
                Ok(report)
            }
            PageType::Unknown => bail!(
                "page {} reachable from root has invalid type byte {:#04x}",
                page_id,
                page[0]
            ),
        }
    }

    /// The chain must visit exactly `leaves` (the walk's key-ordered leaf
    /// sequence), with mirrored back links and globally ascending keys.
    fn check_leaf_chain(&self, leaves: &[u32]) -> Result<()> {
        let mut prev_id = INVALID_PAGE;
        let mut last_key: Option<i32> = None;

        for (idx, &leaf_id) in leaves.iter().enumerate() {
            let leaf = LeafNode::from_page(self.pager().page(leaf_id)?)?;

            ensure!(
                leaf.prev_leaf() == prev_id,
                "leaf {} prev_leaf is {}, expected {}",
                leaf_id,
                leaf.prev_leaf(),
                prev_id
            );

            let expected_next = leaves.get(idx + 1).copied().unwrap_or(INVALID_PAGE);
            ensure!(
                leaf.next_leaf() == expected_next,
                "leaf {} next_leaf is {}, expected {}",
                leaf_id,
                leaf.next_leaf(),
                expected_next
            );

            for i in 0..leaf.num_keys() {
                let key = leaf.key_at(i);
                if let Some(last) = last_key {
                    ensure!(
                        last < key,
                        "leaf chain keys not ascending: {} then {} (leaf {})",
                        last,
                        key,
                        leaf_id
                    );
                }
                last_key = Some(key);
            }

            prev_id = leaf_id;
        }

        Ok(())
    }

    fn check_free_list(
        &self,
        free_head: u32,
        num_pages: u32,
        live: &HashSet<u32>,
    ) -> Result<()> {
        let mut seen = HashSet::new();
        let mut cursor = free_head;

        while cursor != INVALID_PAGE {
            ensure!(cursor != 0, "metadata page on the free list");
            ensure!(
                cursor < num_pages,
                "free page {} beyond allocation watermark {}",
                cursor,
                num_pages
            );
            ensure!(seen.insert(cursor), "free list cycle at page {}", cursor);
            ensure!(
                !live.contains(&cursor),
                "page {} is both live and on the free list",
                cursor
            );

            let page = self.pager().page(cursor)?;
            cursor = u32::from_le_bytes(page[..4].try_into().unwrap());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VALUE_SIZE;
    use tempfile::tempdir;

    fn open_tree() -> (tempfile::TempDir, BPlusTree) {
        let dir = tempdir().unwrap();
        let tree = BPlusTree::open(dir.path().join("index.db")).unwrap();
        (dir, tree)
    }

    #[test]
    fn empty_tree_passes() {
        let (_dir, tree) = open_tree();
        tree.check_integrity().unwrap();
    }

    #[test]
    fn single_leaf_tree_passes() {
        let (_dir, mut tree) = open_tree();
        for key in [5, -3, 12] {
            tree.write(key, &[1u8; VALUE_SIZE]).unwrap();
        }
        tree.check_integrity().unwrap();
    }

    #[test]
    fn multi_level_tree_passes() {
        let (_dir, mut tree) = open_tree();
        for key in 0..5000 {
            tree.write(key * 3, &[(key % 251) as u8; VALUE_SIZE]).unwrap();
        }
        tree.check_integrity().unwrap();
    }

    #[test]
    fn tree_with_freed_pages_passes() {
        let (_dir, mut tree) = open_tree();
        tree.write(1, &[0u8; VALUE_SIZE]).unwrap();
        tree.delete(1).unwrap();
        tree.write(2, &[0u8; VALUE_SIZE]).unwrap();
        tree.check_integrity().unwrap();
    }

    #[test]
    fn detects_record_count_drift() {
        let (_dir, mut tree) = open_tree();
        tree.write(1, &[0u8; VALUE_SIZE]).unwrap();

        tree.pager_mut().meta_mut().unwrap().set_num_records(2);

        let err = tree.check_integrity().unwrap_err();
        assert!(err.to_string().contains("records"));
    }

    #[test]
    fn detects_corrupted_leaf_order() {
        let (_dir, mut tree) = open_tree();
        for key in 0..10 {
            tree.write(key, &[0u8; VALUE_SIZE]).unwrap();
        }

        let root = tree.pager().meta().unwrap().root_page_id();
        {
            // overwrite key 3 in place with a value above its right neighbor
            let page = tree.pager_mut().page_mut(root).unwrap();
            let offset = crate::config::LEAF_KEYS_OFFSET + 3 * crate::config::KEY_SIZE;
            page[offset..offset + 4].copy_from_slice(&99i32.to_le_bytes());
        }

        let err = tree.check_integrity().unwrap_err();
        assert!(err.to_string().contains("ascending"));
    }

    #[test]
    fn detects_broken_chain_link() {
        let (_dir, mut tree) = open_tree();
        for key in 0..200 {
            tree.write(key, &[0u8; VALUE_SIZE]).unwrap();
        }

        let report_err = {
            let root = tree.pager().meta().unwrap().root_page_id();
            let first_leaf = {
                let page = tree.pager().page(root).unwrap();
                let node = InteriorNode::from_page(page).unwrap();
                node.child_at(0)
            };
            let page = tree.pager_mut().page_mut(first_leaf).unwrap();
            let mut leaf = crate::btree::LeafNodeMut::from_page(page).unwrap();
            leaf.set_next_leaf(INVALID_PAGE);
            tree.check_integrity().unwrap_err()
        };

        assert!(report_err.to_string().contains("next_leaf"));
    }
}
