use crate::BlockId;
use alloc::vec::Vec;

/// Per-slot bookkeeping, protected by the cache's spin lock.
#[derive(Debug)]
pub(crate) struct Node {
    /// Block currently cached in the slot; `None` until first use.
    pub(crate) block: Option<BlockId>,
    /// Claims on the slot; reassignable only at zero.
    pub(crate) refcnt: u32,
    prev: usize,
    next: usize,
}

/// Recency list over slot indices.
///
/// Doubly linked through indices rather than pointers, with a sentinel at
/// the last index: `sentinel.next` is the most recently used slot and
/// `sentinel.prev` the least recently used one.
#[derive(Debug)]
pub(crate) struct Lru {
    nodes: Vec<Node>,
}

impl Lru {
    pub(crate) fn new(slots: usize) -> Self {
        let mut nodes = Vec::with_capacity(slots + 1);
        nodes.extend((0..=slots).map(|_| Node {
            block: None,
            refcnt: 0,
            prev: slots,
            next: slots,
        }));

        let mut lru = Self { nodes };
        for index in 0..slots {
            lru.push_front(index);
        }
        lru
    }

    #[inline]
    fn sentinel(&self) -> usize {
        self.nodes.len() - 1
    }

    #[inline]
    pub(crate) fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, index: usize) -> &mut Node {
        &mut self.nodes[index]
    }

    /// Slot currently mapped to `block`, searching from most recently used.
    pub(crate) fn find(&self, block: BlockId) -> Option<usize> {
        self.iter_mru().find(|&i| self.nodes[i].block == Some(block))
    }

    /// Least recently used slot nobody references.
    pub(crate) fn least_recent_unused(&self) -> Option<usize> {
        let sentinel = self.sentinel();
        let mut index = self.nodes[sentinel].prev;
        while index != sentinel {
            if self.nodes[index].refcnt == 0 {
                return Some(index);
            }
            index = self.nodes[index].prev;
        }
        None
    }

    /// Moves `index` to the most recently used end.
    pub(crate) fn move_to_front(&mut self, index: usize) {
        self.unlink(index);
        self.push_front(index);
    }

    /// Slot indices from most to least recently used.
    pub(crate) fn iter_mru(&self) -> impl Iterator<Item = usize> + '_ {
        let sentinel = self.sentinel();
        let mut index = self.nodes[sentinel].next;
        core::iter::from_fn(move || {
            if index == sentinel {
                return None;
            }
            let current = index;
            index = self.nodes[current].next;
            Some(current)
        })
    }

    fn unlink(&mut self, index: usize) {
        let Node { prev, next, .. } = self.nodes[index];
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
    }

    fn push_front(&mut self, index: usize) {
        let sentinel = self.sentinel();
        let first = self.nodes[sentinel].next;
        self.nodes[index].prev = sentinel;
        self.nodes[index].next = first;
        self.nodes[first].prev = index;
        self.nodes[sentinel].next = index;
    }
}
