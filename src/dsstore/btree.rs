//! dsstore::btree
//!
//! Walks the `DSDB` B-tree and yields its records in key order.
//!
//! The master block holds `root`, `levels`, `records`, `nodes` and a page
//! size. Each node starts with `P` and a record count. Leaves (`P == 0`)
//! hold records back to back; internal nodes hold `(child, record)` pairs
//! with `P` as the rightmost child.
//!
//! Traversal is iterative over an explicit stack so a hostile file cannot
//! exhaust the call stack. Depth is capped and every node may be visited
//! once.

use std::collections::HashSet;

use log::warn;

use super::buddy::BuddyAllocator;
use super::record::Record;
use super::DsStoreError;

/// Deepest node level accepted. Finder trees rarely exceed 3.
pub const MAX_TREE_DEPTH: u32 = 32;

/// Fields of the `DSDB` master block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TreeHeader {
    pub root: u32,
    pub levels: u32,
    pub records: u32,
    pub nodes: u32,
    pub page_size: u32,
}

impl TreeHeader {
    pub(crate) fn read(alloc: &BuddyAllocator<'_>, block: u32) -> Result<Self, DsStoreError> {
        let mut r = alloc.block(block)?;
        Ok(Self {
            root: r.u32("B-tree root")?,
            levels: r.u32("B-tree levels")?,
            records: r.u32("B-tree record count")?,
            nodes: r.u32("B-tree node count")?,
            page_size: r.u32("B-tree page size")?,
        })
    }
}

enum Step {
    Node { block: u32, depth: u32 },
    Emit(Record),
}

/// Collect every record reachable from the root, in key order.
pub(crate) fn walk(
    alloc: &BuddyAllocator<'_>,
    header: &TreeHeader,
) -> Result<Vec<Record>, DsStoreError> {
    if header.records == 0 {
        return Ok(Vec::new());
    }
    if header.levels > MAX_TREE_DEPTH {
        return Err(DsStoreError::Format(format!(
            "B-tree claims {} levels, limit is {MAX_TREE_DEPTH}",
            header.levels
        )));
    }

    // The header count is untrusted; cap the preallocation.
    let mut out = Vec::with_capacity((header.records as usize).min(4096));
    let mut visited = HashSet::new();
    let mut stack = vec![Step::Node {
        block: header.root,
        depth: 0,
    }];

    while let Some(step) = stack.pop() {
        let (block, depth) = match step {
            Step::Emit(record) => {
                out.push(record);
                continue;
            }
            Step::Node { block, depth } => (block, depth),
        };

        if depth > MAX_TREE_DEPTH {
            return Err(DsStoreError::Format(format!(
                "B-tree deeper than {MAX_TREE_DEPTH} levels"
            )));
        }
        if !visited.insert(block) {
            return Err(DsStoreError::Format(format!(
                "B-tree cycle: node {block} reached twice"
            )));
        }

        let mut r = alloc.block(block)?;
        let p = r.u32("node pointer")?;
        let count = r.u32("node record count")?;
        let internal = depth < header.levels;

        match (internal, p != 0) {
            (false, false) => {
                for _ in 0..count {
                    out.push(Record::read(&mut r)?);
                }
            }
            (true, true) => {
                let mut entries = Vec::new();
                for _ in 0..count {
                    let child = r.u32("child node id")?;
                    entries.push((child, Record::read(&mut r)?));
                }
                // Pushed in reverse so children and separators pop in order.
                stack.push(Step::Node {
                    block: p,
                    depth: depth + 1,
                });
                for (child, record) in entries.into_iter().rev() {
                    stack.push(Step::Emit(record));
                    stack.push(Step::Node {
                        block: child,
                        depth: depth + 1,
                    });
                }
            }
            (true, false) => {
                return Err(DsStoreError::Format(format!(
                    "node {block} at depth {depth} should be internal but has no right child"
                )))
            }
            (false, true) => {
                return Err(DsStoreError::Format(format!(
                    "node {block} at depth {depth} should be a leaf but points to {p}"
                )))
            }
        }
    }

    if out.len() != header.records as usize {
        warn!(
            "DS_Store B-tree header claims {} records, found {}",
            header.records,
            out.len()
        );
    }
    Ok(out)
}
