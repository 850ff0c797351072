//! LRU List Module
//!
//! Recency ordering for cache eviction, kept as an arena-backed doubly-linked
//! list so that touching and evicting are both O(1).

// == Node Handle ==
/// Stable index of a node inside the list arena.
pub type NodeId = usize;

const NIL: NodeId = usize::MAX;

#[derive(Debug)]
struct Node {
    key: String,
    prev: NodeId,
    next: NodeId,
}

// == LRU List ==
/// Tracks access order for LRU eviction.
///
/// - Head = least recently used (next to evict)
/// - Tail = most recently used
///
/// Removed slots are recycled through a free list, so node ids handed out by
/// [`LruList::push_back`] stay valid until that node is removed.
#[derive(Debug)]
pub struct LruList {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    head: NodeId,
    tail: NodeId,
    len: usize,
}

impl Default for LruList {
    fn default() -> Self {
        Self::new()
    }
}

impl LruList {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    // == Push Back ==
    /// Appends a key as most recently used and returns its node id.
    pub fn push_back(&mut self, key: String) -> NodeId {
        let node = Node {
            key,
            prev: self.tail,
            next: NIL,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        if self.tail == NIL {
            self.head = id;
        } else {
            self.nodes[self.tail].next = id;
        }
        self.tail = id;
        self.len += 1;
        id
    }

    // == Move To Back ==
    /// Marks a node as most recently used.
    pub fn move_to_back(&mut self, id: NodeId) {
        if self.tail == id {
            return;
        }
        self.unlink(id);
        self.nodes[id].prev = self.tail;
        self.nodes[id].next = NIL;
        if self.tail == NIL {
            self.head = id;
        } else {
            self.nodes[self.tail].next = id;
        }
        self.tail = id;
    }

    // == Remove ==
    /// Detaches a node and returns its key.
    pub fn remove(&mut self, id: NodeId) -> String {
        self.unlink(id);
        self.free.push(id);
        self.len -= 1;
        std::mem::take(&mut self.nodes[id].key)
    }

    // == Pop Front ==
    /// Removes and returns the least recently used key.
    pub fn pop_front(&mut self) -> Option<String> {
        if self.head == NIL {
            None
        } else {
            Some(self.remove(self.head))
        }
    }

    // == Peek Front ==
    pub fn peek_front(&self) -> Option<&str> {
        (self.head != NIL).then(|| self.nodes[self.head].key.as_str())
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn unlink(&mut self, id: NodeId) {
        let (prev, next) = (self.nodes[id].prev, self.nodes[id].next);
        if prev == NIL {
            self.head = next;
        } else {
            self.nodes[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.nodes[next].prev = prev;
        }
        self.nodes[id].prev = NIL;
        self.nodes[id].next = NIL;
    }
}
