//! Intrusive, circular, doubly linked list with a sentinel head.
//!
//! Grounded on `ecu/dlist.h` / `ecu/dlist.c` for the contract and the merge
//! sort algorithm, and on the raw-pointer self-loop idiom used by
//! `examples/other_examples/.../SFBdragon-tauos__kernel-src-utils-llist.rs`
//! for how to represent "detached" without an `Option` (a freshly
//! constructed or removed node's `next`/`prev` point back at itself).
//!
//! [`DNode`] is deliberately *not* generic over a payload: like `ecu_dnode`,
//! it is a bare link that a caller's own struct embeds as a field. Getting
//! back from a `&DNode` to the enclosing struct uses [`dlist_entry`], an
//! `offsetof`-based macro mirroring `ECU_DLIST_GET_ENTRY`.
//!
//! # Safety contract
//!
//! A [`DNode`]/[`DList`] must be constructed at its final, stable address
//! (via [`DNode::construct_in_place`] / [`DList::construct_in_place`]) and
//! must never be moved afterwards while linked — moving a linked node
//! leaves neighboring nodes pointing at stale memory. [`DNode::boxed`] /
//! [`DList::boxed`] sidestep this for callers who can afford the one
//! allocation: moving a `Box<T>` moves the pointer, never the pointee.

use std::cell::Cell;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use crate::logger::Log;
use crate::object_id::{self, ObjectId, RESERVED};

/// Optional per-node destructor, invoked with the node being destroyed and
/// its id. Must not call any `dlist`/`DNode` API on the same node.
pub type DestroyFn = unsafe fn(&DNode, ObjectId);

/// Retrieves the containing struct of a [`DNode`] field, the same way
/// `ECU_DLIST_GET_ENTRY` does in C.
///
/// # Safety
///
/// `$node` must actually point at the `$field` member of a live `$ty`.
#[macro_export]
macro_rules! dlist_entry {
    ($node:expr, $ty:ty, $field:ident) => {{
        let node_ptr: *const $crate::dlist::DNode = $node;
        (node_ptr as *const u8).sub(::core::mem::offset_of!($ty, $field)) as *const $ty
    }};
}

/// A single node within a [`DList`].
///
/// Mirrors `ecu_dnode`: `next`/`prev` self-reference when the node is
/// detached, `destroy` is the optional user callback, `id` is the object
/// tag.
pub struct DNode {
    next: Cell<NonNull<DNode>>,
    prev: Cell<NonNull<DNode>>,
    destroy: Cell<Option<DestroyFn>>,
    id: Cell<ObjectId>,
}

/// Private marker identifying a [`DNode`] as a [`DList`] sentinel. Never
/// invoked; its presence alone marks the head.
unsafe fn head_marker(_node: &DNode, _id: ObjectId) {
    unreachable!("DList head destroy marker must never be invoked");
}

impl DNode {
    /// Constructs a node in place at `node`, which must be the node's final
    /// resting address.
    ///
    /// # Safety
    ///
    /// `node` must be valid for writes and properly aligned, and must not
    /// already hold a live, linked `DNode`.
    pub unsafe fn construct_in_place(node: *mut DNode, destroy: Option<DestroyFn>, id: ObjectId) {
        ecu_assert!(object_id::is_user_assignable(id));
        let nn = NonNull::new_unchecked(node);
        node.write(DNode {
            next: Cell::new(nn),
            prev: Cell::new(nn),
            destroy: Cell::new(destroy),
            id: Cell::new(id),
        });
    }

    /// Convenience constructor that allocates the node on the heap. Moving
    /// the returned `Box` around afterwards is fine — only the pointee's
    /// address matters, and `Box` never relocates it.
    pub fn boxed(destroy: Option<DestroyFn>, id: ObjectId) -> Box<DNode> {
        let mut storage: Box<MaybeUninit<DNode>> = Box::new(MaybeUninit::uninit());
        unsafe {
            Self::construct_in_place(storage.as_mut_ptr(), destroy, id);
            Box::from_raw(Box::into_raw(storage) as *mut DNode)
        }
    }

    /// This node's object id.
    pub fn id(&self) -> ObjectId {
        ecu_assert!(!self.is_head());
        self.id.get()
    }

    /// True if this node is currently spliced into some list.
    pub fn is_in_list(&self) -> bool {
        self.next.get() != self.as_non_null()
    }

    fn as_non_null(&self) -> NonNull<DNode> {
        NonNull::from(self)
    }

    /// Raw successor pointer. Crate-internal: lets `ntree` walk sibling
    /// links in O(1) without going through a `DList`'s own iterator.
    pub(crate) fn link_next(&self) -> NonNull<DNode> {
        self.next.get()
    }

    /// Raw predecessor pointer. See [`DNode::link_next`].
    pub(crate) fn link_prev(&self) -> NonNull<DNode> {
        self.prev.get()
    }

    fn is_head(&self) -> bool {
        matches!(self.destroy.get(), Some(f) if f as usize == head_marker as usize)
            && self.id.get() == RESERVED
    }

    fn is_destroyed(&self) -> bool {
        !self.is_head() && self.id.get() == RESERVED
    }

    /// Splices `node` (detached) immediately before `pos` (which must
    /// already be linked into a list; the sentinel is acceptable).
    ///
    /// # Safety
    ///
    /// `node` and `pos` must be valid, constructed, non-destroyed nodes.
    pub unsafe fn insert_before(node: NonNull<DNode>, pos: NonNull<DNode>) {
        let node_ref = node.as_ref();
        let pos_ref = pos.as_ref();
        ecu_assert!(node != pos);
        ecu_assert!(!node_ref.is_destroyed() && !pos_ref.is_destroyed());
        ecu_assert!(!node_ref.is_in_list());
        ecu_assert!(pos_ref.is_in_list() || pos_ref.is_head());

        let pos_prev = pos_ref.prev.get();
        node_ref.next.set(pos);
        node_ref.prev.set(pos_prev);
        pos_prev.as_ref().next.set(node);
        pos_ref.prev.set(node);
    }

    /// Splices `node` (detached) immediately after `pos`.
    ///
    /// # Safety
    ///
    /// Same contract as [`DNode::insert_before`].
    pub unsafe fn insert_after(node: NonNull<DNode>, pos: NonNull<DNode>) {
        let next = pos.as_ref().next.get();
        DNode::insert_before(node, next);
    }

    /// Unlinks `node` from whatever list it is in, returning it to the
    /// detached (self-looped) state. Ids and callbacks survive; the node is
    /// immediately reusable.
    ///
    /// # Safety
    ///
    /// `node` must be a linked, non-sentinel node.
    pub unsafe fn remove(node: NonNull<DNode>) {
        let node_ref = node.as_ref();
        ecu_assert!(!node_ref.is_head());
        ecu_assert!(node_ref.is_in_list());

        let next = node_ref.next.get();
        let prev = node_ref.prev.get();
        next.as_ref().prev.set(prev);
        prev.as_ref().next.set(next);
        node_ref.next.set(node);
        node_ref.prev.set(node);
    }

    /// Removes `node` if linked, fires its destroy callback if any, then
    /// invalidates it (any further API use traps).
    ///
    /// # Safety
    ///
    /// `node` must be a previously constructed, non-sentinel node.
    pub unsafe fn destroy<L: Log>(node: NonNull<DNode>) {
        let node_ref = node.as_ref();
        ecu_assert!(!node_ref.is_head());
        ecu_assert!(!node_ref.is_destroyed());

        if node_ref.is_in_list() {
            DNode::remove(node);
        }

        let id = node_ref.id.get();
        if let Some(cb) = node_ref.destroy.get() {
            cb(node_ref, id);
        }
        L::log_node_destroy(id);

        node_ref.destroy.set(None);
        node_ref.id.set(RESERVED);
    }
}

/// A circular doubly linked list with a sentinel head.
///
/// Mirrors `ecu_dlist`: the head is never user-visible and its presence
/// (`destroy == head_marker`, `id == RESERVED`) is itself a validity marker.
pub struct DList {
    head: DNode,
}

impl DList {
    /// Constructs an empty list in place at `list`, which must be the
    /// list's final resting address.
    ///
    /// # Safety
    ///
    /// `list` must be valid for writes and properly aligned.
    pub unsafe fn construct_in_place(list: *mut DList) {
        let head_ptr = std::ptr::addr_of_mut!((*list).head);
        DNode::construct_in_place(head_ptr, Some(head_marker), RESERVED);
    }

    /// Convenience constructor; see [`DNode::boxed`] for why moving the
    /// returned `Box` afterwards is safe.
    pub fn boxed() -> Box<DList> {
        let mut storage: Box<MaybeUninit<DList>> = Box::new(MaybeUninit::uninit());
        unsafe {
            Self::construct_in_place(storage.as_mut_ptr());
            Box::from_raw(Box::into_raw(storage) as *mut DList)
        }
    }

    fn head_ptr(&self) -> NonNull<DNode> {
        NonNull::from(&self.head)
    }

    /// The sentinel's address. Crate-internal: lets `ntree` tell "wrapped
    /// past the end of the children list" apart from a real sibling.
    pub(crate) fn sentinel(&self) -> NonNull<DNode> {
        self.head_ptr()
    }

    /// O(1). True iff the list holds no user nodes.
    pub fn is_empty(&self) -> bool {
        self.head.next.get() == self.head_ptr()
    }

    /// O(n). Size is never cached.
    pub fn size(&self) -> usize {
        self.iter().count()
    }

    /// Inserts `node` at the front of the list.
    ///
    /// # Safety
    ///
    /// `node` must be a constructed, detached node.
    pub unsafe fn push_front(&self, node: NonNull<DNode>) {
        DNode::insert_after(node, self.head_ptr());
    }

    /// Inserts `node` at the back of the list.
    ///
    /// # Safety
    ///
    /// `node` must be a constructed, detached node.
    pub unsafe fn push_back(&self, node: NonNull<DNode>) {
        DNode::insert_before(node, self.head_ptr());
    }

    /// Inserts `node` before `pos`. `pos` must already be in this list (the
    /// sentinel is acceptable, which is equivalent to [`DList::push_back`]).
    ///
    /// # Safety
    ///
    /// `node` must be detached; `pos` must be in this list.
    pub unsafe fn insert_before(&self, node: NonNull<DNode>, pos: NonNull<DNode>) {
        DNode::insert_before(node, pos);
    }

    /// Inserts `node` after `pos`.
    ///
    /// # Safety
    ///
    /// Same contract as [`DList::insert_before`].
    pub unsafe fn insert_after(&self, node: NonNull<DNode>, pos: NonNull<DNode>) {
        DNode::insert_after(node, pos);
    }

    /// Walks the list and inserts `node` before the first element for which
    /// `pred` returns true; if none matches (including an empty list),
    /// pushes to the back.
    ///
    /// # Safety
    ///
    /// `node` must be detached.
    pub unsafe fn insert_before_predicate(
        &self,
        node: NonNull<DNode>,
        mut pred: impl FnMut(&DNode) -> bool,
    ) {
        for candidate in self.iter() {
            if pred(candidate) {
                DNode::insert_before(node, NonNull::from(candidate));
                return;
            }
        }
        self.push_back(node);
    }

    /// Removes `node` from this list, returning it to the detached state.
    ///
    /// # Safety
    ///
    /// `node` must be linked into this list.
    pub unsafe fn remove(&self, node: NonNull<DNode>) {
        DNode::remove(node);
    }

    /// Removes every node without invoking destroy callbacks; all nodes
    /// return to the detached state and are immediately reusable.
    ///
    /// # Safety
    ///
    /// Every node currently in the list must still be valid to unlink.
    pub unsafe fn clear(&self) {
        while let Some(front) = self.iter().next() {
            DNode::remove(NonNull::from(front));
        }
    }

    /// Destroys every node in the list (firing destroy callbacks), then
    /// resets the sentinel so the list is reusable.
    ///
    /// # Safety
    ///
    /// Every node in the list must be a previously constructed, non-sentinel
    /// node whose destroy callback does not touch this same list.
    pub unsafe fn destroy<L: Log>(&mut self) {
        while let Some(front) = self.iter().next() {
            DNode::destroy::<L>(NonNull::from(front));
        }
        self.head.destroy.set(Some(head_marker));
        self.head.id.set(RESERVED);
    }

    /// Read-only traversal. The sentinel is never yielded.
    pub fn iter(&self) -> Iter<'_> {
        let start = self.head.next.get();
        Iter {
            end: self.head_ptr(),
            current: start,
            marker: std::marker::PhantomData,
        }
    }

    /// Traversal that prefetches the successor, so `DNode::remove(current)`
    /// is safe mid-iteration. Yields raw node pointers rather than borrowed
    /// references because removing/destroying `current` requires mutating
    /// aliasing state the borrow checker cannot see through a shared `&self`.
    pub fn iter_mut(&self) -> IterMut<'_> {
        let start = self.head.next.get();
        let next = unsafe { start.as_ref().next.get() };
        IterMut {
            list: self,
            end: self.head_ptr(),
            current: start,
            next,
        }
    }

    /// In-place, stable merge sort (Simon Tatham's linked-list mergesort,
    /// the same algorithm `ecu_dlist_sort` uses, adapted to this module's
    /// pointer representation). O(n log n) time, O(1) extra space beyond
    /// loop counters. `less_than(a, b) == false && less_than(b, a) == false`
    /// preserves the input's relative order for `a`/`b` (stability).
    pub fn sort(&self, mut less_than: impl FnMut(&DNode, &DNode) -> bool) {
        if self.is_empty() {
            return;
        }

        let head = self.head_ptr();
        let mut k: usize = 1;

        unsafe {
            loop {
                let mut p = self.head.next.get();
                let mut merges = 0usize;

                while p != head {
                    merges += 1;
                    let mut q = p;
                    let mut psize = 0usize;
                    for _ in 0..k {
                        psize += 1;
                        q = q.as_ref().next.get();
                        if q == head {
                            break;
                        }
                    }
                    let mut qsize = k;

                    while psize > 0 || (qsize > 0 && q != head) {
                        let take_from_q = if psize == 0 {
                            true
                        } else if qsize == 0 || q == head {
                            false
                        } else {
                            less_than(q.as_ref(), p.as_ref())
                        };

                        let e = if take_from_q {
                            let e = q;
                            q = q.as_ref().next.get();
                            qsize -= 1;
                            // Splice e (from the q run) just before p; e is
                            // already positioned correctly if it came from p.
                            DNode::remove(e);
                            DNode::insert_before(e, p);
                            e
                        } else {
                            let e = p;
                            p = p.as_ref().next.get();
                            psize -= 1;
                            e
                        };
                        let _ = e;
                    }

                    p = q;
                }

                if merges <= 1 {
                    break;
                }
                k *= 2;
            }
        }
    }
}

/// Read-only list iterator. See [`DList::iter`].
pub struct Iter<'a> {
    end: NonNull<DNode>,
    current: NonNull<DNode>,
    marker: std::marker::PhantomData<&'a DList>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a DNode;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == self.end {
            return None;
        }
        // SAFETY: `current` is always a live node in the list being
        // iterated, guaranteed by the list's own invariants; `'a` is tied to
        // the list's borrow.
        let node = unsafe { &*self.current.as_ptr() };
        self.current = node.next.get();
        Some(node)
    }
}

/// Mutation-safe list iterator: prefetches the successor so removing
/// `current` mid-iteration is sound. See [`DList::iter_mut`].
pub struct IterMut<'a> {
    list: &'a DList,
    end: NonNull<DNode>,
    current: NonNull<DNode>,
    next: NonNull<DNode>,
}

impl<'a> IterMut<'a> {
    /// The list this iterator walks.
    pub fn list(&self) -> &'a DList {
        self.list
    }
}

impl<'a> Iterator for IterMut<'a> {
    type Item = NonNull<DNode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == self.end {
            return None;
        }
        let item = self.current;
        self.current = self.next;
        // SAFETY: `self.next` may have been removed by the caller since it
        // was prefetched only if it equals `item`, which cannot happen
        // (it's `item`'s successor at prefetch time); re-reading its `next`
        // here is what makes removing `item` itself safe.
        self.next = unsafe { self.current.as_ref().next.get() };
        Some(item)
    }
}
