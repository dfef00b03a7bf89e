//! Red-black tree keyed by event timestamp
//!
//! Nodes live in an arena and refer to each other by index. Slot 0 is the
//! shared black nil leaf that terminates every path; its parent slot is
//! scratch space during deletion fix-up. Freed slots are recycled.
//!
//! Equal timestamps are sent to the right subtree, so events with the same
//! timestamp come back out in insertion order.

use thiserror::Error;

use super::{key_less, EmptyStoreError, OpCounters, OrderedEventStore};
use crate::event::Event;

const NIL: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Debug, Clone)]
struct Node {
    event: Event,
    color: Color,
    left: usize,
    right: usize,
    parent: usize,
}

impl Node {
    fn sentinel() -> Self {
        Self {
            event: Event::note_off(0.0, 0),
            color: Color::Black,
            left: NIL,
            right: NIL,
            parent: NIL,
        }
    }
}

/// A broken red-black property found by [`EventRbTree::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("root is red")]
    RedRoot,
    #[error("red node {0} has a red child")]
    RedRed(usize),
    #[error("black height differs below node {node}: {left} vs {right}")]
    BlackHeight {
        node: usize,
        left: usize,
        right: usize,
    },
    #[error("node {0} is out of key order")]
    KeyOrder(usize),
    #[error("node {0} has a stale parent link")]
    ParentLink(usize),
    #[error("nil sentinel was recolored red")]
    RedSentinel,
    #[error("reachable node count {reachable} does not match length {len}")]
    Count { reachable: usize, len: usize },
}

/// Instrumented red-black tree of events
#[derive(Debug, Clone)]
pub struct EventRbTree {
    nodes: Vec<Node>,
    free: Vec<usize>,
    root: usize,
    len: usize,
    counters: OpCounters,
}

impl Default for EventRbTree {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRbTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::sentinel()],
            free: Vec::new(),
            root: NIL,
            len: 0,
            counters: OpCounters::default(),
        }
    }

    fn less(&mut self, a: f64, b: f64) -> bool {
        self.counters.comparisons += 1;
        key_less(a, b)
    }

    fn color(&self, x: usize) -> Color {
        self.nodes[x].color
    }

    fn set_color(&mut self, x: usize, color: Color) {
        self.nodes[x].color = color;
    }

    fn left(&self, x: usize) -> usize {
        self.nodes[x].left
    }

    fn right(&self, x: usize) -> usize {
        self.nodes[x].right
    }

    fn parent(&self, x: usize) -> usize {
        self.nodes[x].parent
    }

    fn minimum(&self, mut x: usize) -> usize {
        while self.left(x) != NIL {
            x = self.left(x);
        }
        x
    }

    fn alloc(&mut self, event: Event) -> usize {
        let node = Node {
            event,
            color: Color::Red,
            left: NIL,
            right: NIL,
            parent: NIL,
        };
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn left_rotate(&mut self, x: usize) {
        self.counters.rotations += 1;
        let y = self.right(x);
        let y_left = self.left(y);
        self.nodes[x].right = y_left;
        if y_left != NIL {
            self.nodes[y_left].parent = x;
        }
        let xp = self.parent(x);
        self.nodes[y].parent = xp;
        if xp == NIL {
            self.root = y;
        } else if x == self.left(xp) {
            self.nodes[xp].left = y;
        } else {
            self.nodes[xp].right = y;
        }
        self.nodes[y].left = x;
        self.nodes[x].parent = y;
    }

    fn right_rotate(&mut self, y: usize) {
        self.counters.rotations += 1;
        let x = self.left(y);
        let x_right = self.right(x);
        self.nodes[y].left = x_right;
        if x_right != NIL {
            self.nodes[x_right].parent = y;
        }
        let yp = self.parent(y);
        self.nodes[x].parent = yp;
        if yp == NIL {
            self.root = x;
        } else if y == self.right(yp) {
            self.nodes[yp].right = x;
        } else {
            self.nodes[yp].left = x;
        }
        self.nodes[x].right = y;
        self.nodes[y].parent = x;
    }

    /// Insert an event in O(log n)
    pub fn push(&mut self, event: Event) {
        self.counters.pushes += 1;
        let z = self.alloc(event);
        let key = event.timestamp;

        let mut y = NIL;
        let mut x = self.root;
        while x != NIL {
            y = x;
            if self.less(key, self.nodes[x].event.timestamp) {
                x = self.left(x);
            } else {
                x = self.right(x);
            }
        }

        self.nodes[z].parent = y;
        if y == NIL {
            self.root = z;
        } else if self.less(key, self.nodes[y].event.timestamp) {
            self.nodes[y].left = z;
        } else {
            self.nodes[y].right = z;
        }
        self.len += 1;

        self.insert_fixup(z);
    }

    fn insert_fixup(&mut self, mut z: usize) {
        while self.color(self.parent(z)) == Color::Red {
            let zp = self.parent(z);
            let zpp = self.parent(zp);
            if zp == self.left(zpp) {
                let uncle = self.right(zpp);
                if self.color(uncle) == Color::Red {
                    // red uncle: recolor and move up
                    self.set_color(zp, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(zpp, Color::Red);
                    z = zpp;
                } else {
                    if z == self.right(zp) {
                        // zig-zag: straighten first
                        z = zp;
                        self.left_rotate(z);
                    }
                    let zp = self.parent(z);
                    let zpp = self.parent(zp);
                    self.set_color(zp, Color::Black);
                    self.set_color(zpp, Color::Red);
                    self.right_rotate(zpp);
                }
            } else {
                let uncle = self.left(zpp);
                if self.color(uncle) == Color::Red {
                    self.set_color(zp, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(zpp, Color::Red);
                    z = zpp;
                } else {
                    if z == self.left(zp) {
                        z = zp;
                        self.right_rotate(z);
                    }
                    let zp = self.parent(z);
                    let zpp = self.parent(zp);
                    self.set_color(zp, Color::Black);
                    self.set_color(zpp, Color::Red);
                    self.left_rotate(zpp);
                }
            }
        }
        let root = self.root;
        self.set_color(root, Color::Black);
    }

    fn transplant(&mut self, u: usize, v: usize) {
        let up = self.parent(u);
        if up == NIL {
            self.root = v;
        } else if u == self.left(up) {
            self.nodes[up].left = v;
        } else {
            self.nodes[up].right = v;
        }
        // v may be the sentinel; its parent is scratch for the fix-up
        self.nodes[v].parent = up;
    }

    fn delete_node(&mut self, z: usize) {
        let mut y = z;
        let mut removed_color = self.color(y);
        let x;

        if self.left(z) == NIL {
            x = self.right(z);
            self.transplant(z, x);
        } else if self.right(z) == NIL {
            x = self.left(z);
            self.transplant(z, x);
        } else {
            y = self.minimum(self.right(z));
            removed_color = self.color(y);
            x = self.right(y);
            if self.parent(y) == z {
                self.nodes[x].parent = y;
            } else {
                self.transplant(y, x);
                let zr = self.right(z);
                self.nodes[y].right = zr;
                self.nodes[zr].parent = y;
            }
            self.transplant(z, y);
            let zl = self.left(z);
            self.nodes[y].left = zl;
            self.nodes[zl].parent = y;
            let z_color = self.color(z);
            self.set_color(y, z_color);
        }

        if removed_color == Color::Black {
            self.delete_fixup(x);
        }
    }

    fn delete_fixup(&mut self, mut x: usize) {
        while x != self.root && self.color(x) == Color::Black {
            let xp = self.parent(x);
            if x == self.left(xp) {
                let mut w = self.right(xp);
                if self.color(w) == Color::Red {
                    // red sibling: rotate it above the parent
                    self.set_color(w, Color::Black);
                    self.set_color(xp, Color::Red);
                    self.left_rotate(xp);
                    w = self.right(self.parent(x));
                }
                if self.color(self.left(w)) == Color::Black
                    && self.color(self.right(w)) == Color::Black
                {
                    self.set_color(w, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.color(self.right(w)) == Color::Black {
                        let wl = self.left(w);
                        self.set_color(wl, Color::Black);
                        self.set_color(w, Color::Red);
                        self.right_rotate(w);
                        w = self.right(self.parent(x));
                    }
                    let xp = self.parent(x);
                    let xp_color = self.color(xp);
                    self.set_color(w, xp_color);
                    self.set_color(xp, Color::Black);
                    let wr = self.right(w);
                    self.set_color(wr, Color::Black);
                    self.left_rotate(xp);
                    x = self.root;
                }
            } else {
                let mut w = self.left(xp);
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(xp, Color::Red);
                    self.right_rotate(xp);
                    w = self.left(self.parent(x));
                }
                if self.color(self.right(w)) == Color::Black
                    && self.color(self.left(w)) == Color::Black
                {
                    self.set_color(w, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.color(self.left(w)) == Color::Black {
                        let wr = self.right(w);
                        self.set_color(wr, Color::Black);
                        self.set_color(w, Color::Red);
                        self.left_rotate(w);
                        w = self.left(self.parent(x));
                    }
                    let xp = self.parent(x);
                    let xp_color = self.color(xp);
                    self.set_color(w, xp_color);
                    self.set_color(xp, Color::Black);
                    let wl = self.left(w);
                    self.set_color(wl, Color::Black);
                    self.right_rotate(xp);
                    x = self.root;
                }
            }
        }
        self.set_color(x, Color::Black);
    }

    /// Remove and return the earliest event
    ///
    /// Among equal timestamps the earliest inserted comes out first.
    pub fn pop_next(&mut self) -> Result<Event, EmptyStoreError> {
        if self.root == NIL {
            return Err(EmptyStoreError);
        }
        self.counters.pops += 1;
        let z = self.minimum(self.root);
        let event = self.nodes[z].event;
        self.delete_node(z);
        self.free.push(z);
        self.len -= 1;
        // Deletion parks scratch links on the sentinel; clear them
        self.nodes[NIL].parent = NIL;
        Ok(event)
    }

    /// Earliest event without removing it
    pub fn peek(&self) -> Option<&Event> {
        if self.root == NIL {
            None
        } else {
            Some(&self.nodes[self.minimum(self.root)].event)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root == NIL
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn counters(&self) -> OpCounters {
        self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters = OpCounters::default();
    }

    /// Check every red-black property and link
    ///
    /// Returns the black height of the tree (nil leaves count as one).
    pub fn validate(&self) -> Result<usize, InvariantViolation> {
        if self.color(NIL) != Color::Black {
            return Err(InvariantViolation::RedSentinel);
        }
        if self.color(self.root) != Color::Black {
            return Err(InvariantViolation::RedRoot);
        }
        if self.root != NIL && self.parent(self.root) != NIL {
            return Err(InvariantViolation::ParentLink(self.root));
        }
        let mut reachable = 0;
        let height = self.validate_subtree(self.root, (None, None), &mut reachable)?;
        if reachable != self.len {
            return Err(InvariantViolation::Count {
                reachable,
                len: self.len,
            });
        }
        Ok(height)
    }

    fn validate_subtree(
        &self,
        x: usize,
        bounds: (Option<f64>, Option<f64>),
        reachable: &mut usize,
    ) -> Result<usize, InvariantViolation> {
        if x == NIL {
            return Ok(1);
        }
        *reachable += 1;
        let node = &self.nodes[x];
        let key = node.event.timestamp;

        // Equal keys may sit on either side after a rotation
        let (low, high) = bounds;
        let below = low.is_some_and(|low| key_less(key, low));
        let above = high.is_some_and(|high| key_less(high, key));
        if below || above {
            return Err(InvariantViolation::KeyOrder(x));
        }

        for child in [node.left, node.right] {
            if child == NIL {
                continue;
            }
            if self.parent(child) != x {
                return Err(InvariantViolation::ParentLink(child));
            }
            if node.color == Color::Red && self.color(child) == Color::Red {
                return Err(InvariantViolation::RedRed(x));
            }
        }

        let left = self.validate_subtree(node.left, (low, Some(key)), reachable)?;
        let right = self.validate_subtree(node.right, (Some(key), high), reachable)?;
        if left != right {
            return Err(InvariantViolation::BlackHeight { node: x, left, right });
        }
        Ok(left + usize::from(node.color == Color::Black))
    }
}

impl OrderedEventStore for EventRbTree {
    fn load(&mut self, events: &[Event]) {
        for &event in events {
            self.push(event);
        }
    }

    fn pop(&mut self) -> Result<Event, EmptyStoreError> {
        self.pop_next()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn counters(&self) -> OpCounters {
        self.counters
    }

    fn reset_counters(&mut self) {
        EventRbTree::reset_counters(self)
    }
}
