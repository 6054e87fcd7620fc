//! Recency-ordered key sequence backed by [`SlotArena`].
//!
//! Holds the keys of one shard in access order. Nodes are linked by
//! [`SlotId`], so the shard's map can store a node's position and splice it to
//! the front in O(1) without raw pointers.
//!
//! ## Architecture
//!
//! ```text
//!   arena (SlotArena<Node<K>>)
//!   ┌────────┬──────────────────────────────────────────────┐
//!   │ SlotId │ Node { key, prev, next }                     │
//!   ├────────┼──────────────────────────────────────────────┤
//!   │ id_1   │ { key: 7,  prev: None,       next: id_2 }    │
//!   │ id_2   │ { key: 42, prev: Some(id_1), next: id_3 }    │
//!   │ id_3   │ { key: 3,  prev: Some(id_2), next: None }    │
//!   └────────┴──────────────────────────────────────────────┘
//!
//!   head ─► [id_1] ◄──► [id_2] ◄──► [id_3] ◄── tail
//!    (MRU)                                     (LRU)
//! ```
//!
//! ## Performance
//! - `push_front`, `pop_back`, `move_to_front`, `remove`: O(1)
//! - `iter`: O(n)

use crate::ds::slot_arena::{SlotArena, SlotId};

#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

/// Doubly linked list of keys, most recently used at the head.
#[derive(Debug)]
pub struct RecencyList<K> {
    arena: SlotArena<Node<K>>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
}

impl<K> RecencyList<K> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            arena: SlotArena::new(),
            head: None,
            tail: None,
        }
    }

    /// Creates an empty list with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: SlotArena::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Key at the MRU end.
    pub fn front(&self) -> Option<&K> {
        self.head.and_then(|id| self.key(id))
    }

    /// Key at the LRU end.
    pub fn back(&self) -> Option<&K> {
        self.tail.and_then(|id| self.key(id))
    }

    pub fn key(&self, id: SlotId) -> Option<&K> {
        self.arena.get(id).map(|node| &node.key)
    }

    /// Inserts `key` at the MRU end and returns its position handle.
    pub fn push_front(&mut self, key: K) -> SlotId {
        let id = self.arena.insert(Node {
            key,
            prev: None,
            next: self.head,
        });
        match self.head {
            Some(head) => {
                if let Some(node) = self.arena.get_mut(head) {
                    node.prev = Some(id);
                }
            },
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        id
    }

    /// Removes and returns the LRU key.
    pub fn pop_back(&mut self) -> Option<K> {
        let id = self.tail?;
        self.remove(id)
    }

    /// Unlinks the node at `id` and returns its key.
    pub fn remove(&mut self, id: SlotId) -> Option<K> {
        self.detach(id)?;
        self.arena.remove(id).map(|node| node.key)
    }

    /// Splices `id` to the MRU end; returns `false` if `id` is not live.
    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        if !self.arena.contains(id) {
            return false;
        }
        if self.head == Some(id) {
            return true;
        }
        self.detach(id);
        self.attach_front(id);
        true
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterates keys from MRU to LRU.
    pub fn iter(&self) -> RecencyIter<'_, K> {
        RecencyIter {
            list: self,
            current: self.head,
        }
    }

    fn detach(&mut self, id: SlotId) -> Option<()> {
        let (prev, next) = {
            let node = self.arena.get(id)?;
            (node.prev, node.next)
        };

        match prev {
            Some(prev_id) => {
                if let Some(prev_node) = self.arena.get_mut(prev_id) {
                    prev_node.next = next;
                }
            },
            None => self.head = next,
        }

        match next {
            Some(next_id) => {
                if let Some(next_node) = self.arena.get_mut(next_id) {
                    next_node.prev = prev;
                }
            },
            None => self.tail = prev,
        }

        if let Some(node) = self.arena.get_mut(id) {
            node.prev = None;
            node.next = None;
        }
        Some(())
    }

    fn attach_front(&mut self, id: SlotId) {
        let old_head = self.head;
        match self.arena.get_mut(id) {
            Some(node) => {
                node.prev = None;
                node.next = old_head;
            },
            None => return,
        }
        match old_head {
            Some(old_head) => {
                if let Some(head_node) = self.arena.get_mut(old_head) {
                    head_node.prev = Some(id);
                }
            },
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if self.head.is_none() || self.tail.is_none() {
            assert!(self.head.is_none());
            assert!(self.tail.is_none());
            assert_eq!(self.len(), 0);
            return;
        }

        let mut count = 0usize;
        let mut current = self.head;
        let mut prev = None;
        while let Some(id) = current {
            let node = self.arena.get(id).expect("linked node missing from arena");
            assert_eq!(node.prev, prev);
            if node.next.is_none() {
                assert_eq!(self.tail, Some(id));
            }
            prev = Some(id);
            current = node.next;
            count += 1;
            assert!(count <= self.len(), "cycle in recency list");
        }
        assert_eq!(count, self.len());
    }
}

impl<K> Default for RecencyList<K> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RecencyIter<'a, K> {
    list: &'a RecencyList<K>,
    current: Option<SlotId>,
}

impl<'a, K> Iterator for RecencyIter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.list.arena.get(id)?;
        self.current = node.next;
        Some(&node.key)
    }
}
