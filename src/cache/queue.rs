//! Key Queue Module
//!
//! Insertion-ordered queue of keys used to pick eviction victims.

// == Node Handle ==
/// Handle to a queued key, returned by [`KeyQueue::push`].
///
/// Handles go stale once their node is popped, removed or the queue is
/// cleared; stale handles are ignored by [`KeyQueue::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId {
    index: usize,
    generation: u64,
    epoch: u64,
}

#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct Slot<K> {
    generation: u64,
    node: Option<Node<K>>,
}

// == Key Queue ==
/// Doubly-linked FIFO stored in an arena of slots with a free list.
///
/// - Head = oldest key
/// - Tail = newest key
///
/// Not synchronized; the owning bucket's lock guards it.
#[derive(Debug)]
pub struct KeyQueue<K> {
    slots: Vec<Slot<K>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    epoch: u64,
}

impl<K> Default for KeyQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KeyQueue<K> {
    // == Constructor ==
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
            epoch: 0,
        }
    }

    // == Push ==
    /// Appends a key at the tail (newest position).
    pub fn push(&mut self, key: K) -> NodeId {
        let node = Node {
            key,
            prev: self.tail,
            next: None,
        };

        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;

        NodeId {
            index,
            generation: self.slots[index].generation,
            epoch: self.epoch,
        }
    }

    // == Pop Oldest ==
    /// Removes and returns the head key, or `None` when empty.
    pub fn pop_oldest(&mut self) -> Option<K> {
        self.head.map(|index| self.unlink(index))
    }

    // == Pop Newest ==
    /// Removes and returns the tail key, or `None` when empty.
    pub fn pop_newest(&mut self) -> Option<K> {
        self.tail.map(|index| self.unlink(index))
    }

    pub fn peek_oldest(&self) -> Option<&K> {
        self.head.map(|index| &self.node(index).key)
    }

    pub fn peek_newest(&self) -> Option<&K> {
        self.tail.map(|index| &self.node(index).key)
    }

    // == Remove By Handle ==
    /// Unlinks the node behind `id` in O(1). Returns `None` for stale handles.
    pub fn remove(&mut self, id: NodeId) -> Option<K> {
        if id.epoch != self.epoch {
            return None;
        }
        let slot = self.slots.get(id.index)?;
        if slot.generation != id.generation || slot.node.is_none() {
            return None;
        }
        Some(self.unlink(id.index))
    }

    // == Retain ==
    /// Walks the queue from oldest to newest once, unlinking every key for
    /// which `keep` returns false. Relative order of kept keys is preserved.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K) -> bool,
    {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let node = self.node(index);
            cursor = node.next;
            if !keep(&node.key) {
                self.unlink(index);
            }
        }
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Clear ==
    /// Drops every key. Handles issued before the call become stale.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
        self.epoch += 1;
    }

    /// Iterates keys from oldest to newest.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            queue: self,
            cursor: self.head,
        }
    }

    fn node(&self, index: usize) -> &Node<K> {
        self.slots[index]
            .node
            .as_ref()
            .expect("linked index points at an occupied slot")
    }

    fn node_mut(&mut self, index: usize) -> &mut Node<K> {
        self.slots[index]
            .node
            .as_mut()
            .expect("linked index points at an occupied slot")
    }

    fn unlink(&mut self, index: usize) -> K {
        let slot = &mut self.slots[index];
        let node = slot
            .node
            .take()
            .expect("linked index points at an occupied slot");
        slot.generation = slot.generation.wrapping_add(1);

        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.node_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }

        self.free.push(index);
        self.len -= 1;
        node.key
    }
}

impl<K: PartialEq> KeyQueue<K> {
    // == Delete By Key ==
    /// Unlinks the oldest occurrence of `key`. Linear scan.
    pub fn delete(&mut self, key: &K) -> bool {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let node = self.node(index);
            if node.key == *key {
                self.unlink(index);
                return true;
            }
            cursor = node.next;
        }
        false
    }
}

/// Oldest-to-newest iterator over a [`KeyQueue`].
pub struct Iter<'a, K> {
    queue: &'a KeyQueue<K>,
    cursor: Option<usize>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.node(self.cursor?);
        self.cursor = node.next;
        Some(&node.key)
    }
}
