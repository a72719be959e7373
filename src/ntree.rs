//! Intrusive n-ary tree built atop [`crate::dlist`].
//!
//! Grounded on `ecu/ntree.h` for the API surface (spec.md §4.2 is
//! authoritative over `ecu/ntree.c`, which is an abandoned draft in
//! `original_source/` — several of its functions are empty stubs and its
//! root-detection convention contradicts the documented invariant). Each
//! [`NtNode`] owns a `children` [`DList`] and a `self_link` [`DNode`] giving
//! it a position in its parent's `children` list, plus a raw `parent`
//! pointer (`None` for a root).
//!
//! Five iterator families walk a tree: [`NtNode::children`] (front to
//! back), [`NtNode::ancestors`] / [`NtNode::ancestors_at`] (up to the
//! root, excluding or including the start node), [`NtNode::siblings`]
//! (circular, starting just after the node), and [`NtNode::preorder`] /
//! [`NtNode::postorder`]. [`NtNode::next`] / [`NtNode::prev`] give O(1)
//! single-step sibling access without building an iterator.

use std::cell::Cell;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use crate::dlist::{DList, DNode, DestroyFn};
use crate::dlist_entry;
use crate::logger::Log;
use crate::object_id::{self, ObjectId, RESERVED};

/// A node in an n-ary tree.
///
/// `self_link` gives this node a position among its parent's children;
/// `children` is this node's own child list; `parent` is `None` for a root.
pub struct NtNode {
    self_link: DNode,
    children: DList,
    parent: Cell<Option<NonNull<NtNode>>>,
    id: Cell<ObjectId>,
    destroy: Cell<Option<DestroyFn>>,
}

impl NtNode {
    /// Constructs a node in place at `node`, detached (no parent, no
    /// children).
    ///
    /// # Safety
    ///
    /// `node` must be valid for writes, properly aligned, and must not
    /// already hold a live, linked `NtNode`.
    pub unsafe fn construct_in_place(node: *mut NtNode, destroy: Option<DestroyFn>, id: ObjectId) {
        ecu_assert!(object_id::is_user_assignable(id));
        let self_link_ptr = std::ptr::addr_of_mut!((*node).self_link);
        DNode::construct_in_place(self_link_ptr, None, id);
        let children_ptr = std::ptr::addr_of_mut!((*node).children);
        DList::construct_in_place(children_ptr);
        std::ptr::addr_of_mut!((*node).parent).write(Cell::new(None));
        std::ptr::addr_of_mut!((*node).id).write(Cell::new(id));
        std::ptr::addr_of_mut!((*node).destroy).write(Cell::new(destroy));
    }

    /// Convenience constructor; see [`DNode::boxed`] for why moving the
    /// returned `Box` afterwards is safe.
    pub fn boxed(destroy: Option<DestroyFn>, id: ObjectId) -> Box<NtNode> {
        let mut storage: Box<MaybeUninit<NtNode>> = Box::new(MaybeUninit::uninit());
        unsafe {
            Self::construct_in_place(storage.as_mut_ptr(), destroy, id);
            Box::from_raw(Box::into_raw(storage) as *mut NtNode)
        }
    }

    fn as_non_null(&self) -> NonNull<NtNode> {
        NonNull::from(self)
    }

    fn is_destroyed(&self) -> bool {
        self.id.get() == RESERVED
    }

    /// This node's object id.
    pub fn id(&self) -> ObjectId {
        self.id.get()
    }

    /// True if this node has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.get().is_none()
    }

    /// True if this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of direct children. O(n) in the child count.
    pub fn count(&self) -> usize {
        self.children.size()
    }

    /// Total number of nodes in the subtree rooted at `self`, `self`
    /// included. O(n) in the subtree size.
    pub fn size(&self) -> usize {
        self.preorder().count()
    }

    /// This node's depth: 0 for a root, otherwise one more than its
    /// parent's level.
    pub fn level(&self) -> usize {
        self.parent().map_or(0, |p| p.level() + 1)
    }

    /// True if `self` is `other` or a descendant of `other`.
    pub fn in_subtree(&self, other: &NtNode) -> bool {
        let other_ptr = other.as_non_null();
        let mut cur = Some(self.as_non_null());
        while let Some(n) = cur {
            if n == other_ptr {
                return true;
            }
            cur = unsafe { n.as_ref().parent.get() };
        }
        false
    }

    /// This node's parent, if any.
    pub fn parent(&self) -> Option<&NtNode> {
        self.parent.get().map(|p| unsafe { &*p.as_ptr() })
    }

    /// Walks up `levels` ancestors (0 returns `self`).
    pub fn parent_at(&self, levels: usize) -> Option<&NtNode> {
        let mut cur = self;
        for _ in 0..levels {
            cur = cur.parent()?;
        }
        Some(cur)
    }

    /// The next sibling in the parent's child order, or `None` if `self` is
    /// the last child (or a root). O(1): steps the intrusive sibling link
    /// directly rather than scanning the parent's child list.
    pub fn next(&self) -> Option<&NtNode> {
        let parent = self.parent()?;
        let next_link = self.self_link.link_next();
        if next_link == parent.children.sentinel() {
            None
        } else {
            Some(Self::from_self_link(unsafe { &*next_link.as_ptr() }))
        }
    }

    /// The previous sibling in the parent's child order, or `None` if
    /// `self` is the first child (or a root). O(1), same as [`NtNode::next`].
    pub fn prev(&self) -> Option<&NtNode> {
        let parent = self.parent()?;
        let prev_link = self.self_link.link_prev();
        if prev_link == parent.children.sentinel() {
            None
        } else {
            Some(Self::from_self_link(unsafe { &*prev_link.as_ptr() }))
        }
    }

    /// The first child, if any.
    pub fn front_child(&self) -> Option<&NtNode> {
        self.children.iter().next().map(Self::from_self_link)
    }

    /// The last child, if any.
    pub fn last_child(&self) -> Option<&NtNode> {
        self.children.iter().last().map(Self::from_self_link)
    }

    fn from_self_link(link: &DNode) -> &NtNode {
        unsafe { &*(dlist_entry!(link as *const DNode, NtNode, self_link)) }
    }

    /// Pushes `child` to the front of `self`'s children.
    ///
    /// # Safety
    ///
    /// `child` must be a constructed, detached node (no parent, not linked
    /// into any list).
    pub unsafe fn push_child_front<L: Log>(parent: NonNull<NtNode>, child: NonNull<NtNode>) {
        let parent_ref = parent.as_ref();
        let child_ref = child.as_ref();
        ecu_assert!(!parent_ref.is_destroyed() && !child_ref.is_destroyed());
        ecu_assert!(child_ref.is_root());
        parent_ref
            .children
            .push_front(NonNull::from(&child_ref.self_link));
        child_ref.parent.set(Some(parent));
        L::log_link(child_ref.id());
    }

    /// Pushes `child` to the back of `self`'s children.
    ///
    /// # Safety
    ///
    /// Same contract as [`NtNode::push_child_front`].
    pub unsafe fn push_child_back<L: Log>(parent: NonNull<NtNode>, child: NonNull<NtNode>) {
        let parent_ref = parent.as_ref();
        let child_ref = child.as_ref();
        ecu_assert!(!parent_ref.is_destroyed() && !child_ref.is_destroyed());
        ecu_assert!(child_ref.is_root());
        parent_ref
            .children
            .push_back(NonNull::from(&child_ref.self_link));
        child_ref.parent.set(Some(parent));
        L::log_link(child_ref.id());
    }

    /// Inserts `node` as a sibling immediately before `pos` (both become
    /// children of `pos`'s parent).
    ///
    /// # Safety
    ///
    /// `pos` must not be a root; `node` must be detached.
    pub unsafe fn insert_sibling_before<L: Log>(node: NonNull<NtNode>, pos: NonNull<NtNode>) {
        let pos_ref = pos.as_ref();
        let node_ref = node.as_ref();
        let parent = pos_ref
            .parent
            .get()
            .expect("insert_sibling_before: pos is a root");
        ecu_assert!(node_ref.is_root());
        DNode::insert_before(
            NonNull::from(&node_ref.self_link),
            NonNull::from(&pos_ref.self_link),
        );
        node_ref.parent.set(Some(parent));
        L::log_link(node_ref.id());
    }

    /// Inserts `node` as a sibling immediately after `pos`.
    ///
    /// # Safety
    ///
    /// Same contract as [`NtNode::insert_sibling_before`].
    pub unsafe fn insert_sibling_after<L: Log>(node: NonNull<NtNode>, pos: NonNull<NtNode>) {
        let pos_ref = pos.as_ref();
        let node_ref = node.as_ref();
        let parent = pos_ref
            .parent
            .get()
            .expect("insert_sibling_after: pos is a root");
        ecu_assert!(node_ref.is_root());
        DNode::insert_after(
            NonNull::from(&node_ref.self_link),
            NonNull::from(&pos_ref.self_link),
        );
        node_ref.parent.set(Some(parent));
        L::log_link(node_ref.id());
    }

    /// Detaches `node` from its parent. The node keeps its own children; it
    /// becomes a root of its own (now separate) subtree.
    ///
    /// # Safety
    ///
    /// `node` must not already be a root.
    pub unsafe fn remove<L: Log>(node: NonNull<NtNode>) {
        let node_ref = node.as_ref();
        ecu_assert!(!node_ref.is_root());
        DNode::remove(NonNull::from(&node_ref.self_link));
        node_ref.parent.set(None);
        L::log_unlink(node_ref.id());
    }

    /// Removes every child (without destroying them); each detached child
    /// becomes a root of its own subtree.
    ///
    /// # Safety
    ///
    /// Every child must be a node this crate considers valid to detach.
    pub unsafe fn clear<L: Log>(node: NonNull<NtNode>) {
        let node_ref = node.as_ref();
        while let Some(child) = node_ref.front_child() {
            Self::remove::<L>(child.as_non_null());
        }
    }

    /// Destroys the subtree rooted at `node` in postorder (children before
    /// parent), firing each node's destroy callback. Detaches `node` from
    /// its parent first if it has one.
    ///
    /// # Safety
    ///
    /// Every node in the subtree must be a previously constructed node, and
    /// no destroy callback may re-enter any `ntree` API on a node in this
    /// same subtree.
    pub unsafe fn destroy<L: Log>(node: NonNull<NtNode>) {
        let node_ref = node.as_ref();
        if !node_ref.is_root() {
            Self::remove::<L>(node);
        }

        let order: Vec<NonNull<NtNode>> = node_ref.postorder().map(|n| n.as_non_null()).collect();
        for n in order {
            let n_ref = n.as_ref();
            let id = n_ref.id();
            if let Some(cb) = n_ref.destroy.get() {
                cb(&n_ref.self_link, id);
            }
            L::log_node_destroy(id);
            n_ref.destroy.set(None);
            n_ref.id.set(RESERVED);
        }
    }

    /// Returns the lowest common ancestor of `self` and `other`, or `None`
    /// if they belong to disjoint trees. O(depth^2): walk up from `self`,
    /// and at each step check whether that ancestor is `other` or an
    /// ancestor of `other`, the same nested-walk shape `hsm`'s LCA search
    /// uses.
    pub fn lca<'a>(&'a self, other: &'a NtNode) -> Option<&'a NtNode> {
        let mut candidate = Some(self);
        while let Some(c) = candidate {
            if std::ptr::eq(c, other) || other.in_subtree(c) {
                return Some(c);
            }
            candidate = c.parent();
        }
        None
    }

    /// Depth-first preorder search (self first, then children recursively)
    /// for the first node matching `pred`.
    pub fn find(&self, mut pred: impl FnMut(&NtNode) -> bool) -> Option<&NtNode> {
        self.preorder().find(|n| pred(n))
    }

    /// True if this node's linkage is internally consistent: every direct
    /// child's `parent` points back to `self`.
    pub fn valid(&self) -> bool {
        if self.is_destroyed() {
            return true;
        }
        self.children()
            .all(|child| child.parent.get() == Some(self.as_non_null()))
    }

    /// Children of this node, front to back.
    pub fn children(&self) -> ChildIter<'_> {
        ChildIter {
            inner: self.children.iter(),
        }
    }

    /// Ancestors of this node, excluding `self`: parent, grandparent, ...,
    /// up to and including the root.
    pub fn ancestors(&self) -> ParentIter<'_> {
        ParentIter {
            current: self.parent(),
        }
    }

    /// Ancestors starting `levels` steps up from `self` (0 returns `self`
    /// itself as the first item), continuing up to and including the root.
    pub fn ancestors_at(&self, levels: usize) -> ParentIter<'_> {
        ParentIter {
            current: self.parent_at(levels),
        }
    }

    /// Siblings of this node in circular order: starts immediately after
    /// `self`, runs through the rest of the parent's children, wraps back
    /// around to the front, and stops just before `self` would be reached
    /// again. Empty for a root. O(1) per step.
    pub fn siblings(&self) -> SiblingIter<'_> {
        let start = NonNull::from(&self.self_link);
        let (head, current) = match self.parent() {
            Some(p) => (Some(p.children.sentinel()), self.self_link.link_next()),
            None => (None, start),
        };
        SiblingIter {
            head,
            start,
            current,
            done: false,
            marker: std::marker::PhantomData,
        }
    }

    /// Preorder traversal of the subtree rooted at `self` (self, then each
    /// child's subtree in order). Not safe to remove the current node
    /// during iteration — use [`NtNode::postorder`] for that.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            stack: vec![self.as_non_null()],
            marker: std::marker::PhantomData,
        }
    }

    /// Postorder traversal of the subtree rooted at `self` (children's
    /// subtrees fully visited before `self`). Safe to destroy/detach the
    /// just-yielded node, since every node still to be visited is already
    /// queued by pointer before `self` is ever yielded.
    pub fn postorder(&self) -> Postorder<'_> {
        Postorder {
            stack: vec![(self.as_non_null(), false)],
            marker: std::marker::PhantomData,
        }
    }
}

/// Iterator over a node's direct children.
pub struct ChildIter<'a> {
    inner: crate::dlist::Iter<'a>,
}

impl<'a> Iterator for ChildIter<'a> {
    type Item = &'a NtNode;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(NtNode::from_self_link)
    }
}

/// Iterator over a node's ancestor chain. See [`NtNode::ancestors`] and
/// [`NtNode::ancestors_at`].
pub struct ParentIter<'a> {
    current: Option<&'a NtNode>,
}

impl<'a> Iterator for ParentIter<'a> {
    type Item = &'a NtNode;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.current.take()?;
        self.current = cur.parent();
        Some(cur)
    }
}

/// Circular iterator over a node's siblings, starting just after the node
/// and stopping just before reaching it again. See [`NtNode::siblings`].
pub struct SiblingIter<'a> {
    head: Option<NonNull<DNode>>,
    start: NonNull<DNode>,
    current: NonNull<DNode>,
    done: bool,
    marker: std::marker::PhantomData<&'a NtNode>,
}

impl<'a> Iterator for SiblingIter<'a> {
    type Item = &'a NtNode;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if self.current == self.start {
                self.done = true;
                return None;
            }
            if Some(self.current) == self.head {
                // The sentinel is never a real sibling; step past it.
                self.current = unsafe { self.current.as_ref().link_next() };
                continue;
            }
            let item = self.current;
            self.current = unsafe { item.as_ref().link_next() };
            return Some(NtNode::from_self_link(unsafe { &*item.as_ptr() }));
        }
    }
}

/// Preorder traversal: self, then each child's subtree, depth-first.
pub struct Preorder<'a> {
    stack: Vec<NonNull<NtNode>>,
    marker: std::marker::PhantomData<&'a NtNode>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a NtNode;

    fn next(&mut self) -> Option<Self::Item> {
        let top = self.stack.pop()?;
        let top_ref = unsafe { &*top.as_ptr() };
        for child in top_ref.children().collect::<Vec<_>>().into_iter().rev() {
            self.stack.push(child.as_non_null());
        }
        Some(top_ref)
    }
}

/// Postorder traversal: children's subtrees fully visited before the
/// parent. Safe to destroy the node just yielded.
pub struct Postorder<'a> {
    stack: Vec<(NonNull<NtNode>, bool)>,
    marker: std::marker::PhantomData<&'a NtNode>,
}

impl<'a> Iterator for Postorder<'a> {
    type Item = &'a NtNode;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (top, expanded) = *self.stack.last()?;
            if expanded {
                self.stack.pop();
                return Some(unsafe { &*top.as_ptr() });
            }
            self.stack.last_mut().unwrap().1 = true;
            let top_ref = unsafe { &*top.as_ptr() };
            for child in top_ref.children().collect::<Vec<_>>().into_iter().rev() {
                self.stack.push((child.as_non_null(), false));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::NoopLogger;
    use crate::object_id::UNUSED;

    fn leaf(id: ObjectId) -> Box<NtNode> {
        NtNode::boxed(None, id)
    }

    #[test]
    fn fresh_node_is_leaf_root() {
        let n = leaf(UNUSED);
        assert!(n.is_root());
        assert!(n.is_leaf());
        assert_eq!(n.level(), 0);
    }

    #[test]
    fn push_child_sets_parent_and_level() {
        let root = leaf(1);
        let child = leaf(2);
        unsafe {
            NtNode::push_child_back::<NoopLogger>(
                NonNull::from(&*root),
                NonNull::from(&*child),
            );
        }
        assert!(!child.is_root());
        assert_eq!(child.parent().unwrap().id(), 1);
        assert_eq!(child.level(), 1);
        assert_eq!(root.count(), 1);
        assert!(root.valid());
    }

    /// Builds a small example tree:
    /// ```text
    ///        R
    ///      / | \
    ///     A  C  E
    ///    / \    |
    ///   B   D   F
    /// ```
    /// Expected postorder: B, D, A, C, F, E, R.
    fn build_seeded_tree() -> (
        Box<NtNode>,
        Box<NtNode>,
        Box<NtNode>,
        Box<NtNode>,
        Box<NtNode>,
        Box<NtNode>,
        Box<NtNode>,
    ) {
        let r = leaf(1);
        let a = leaf(2);
        let c = leaf(3);
        let e = leaf(4);
        let b = leaf(5);
        let d = leaf(6);
        let f = leaf(7);
        unsafe {
            NtNode::push_child_back::<NoopLogger>(NonNull::from(&*r), NonNull::from(&*a));
            NtNode::push_child_back::<NoopLogger>(NonNull::from(&*r), NonNull::from(&*c));
            NtNode::push_child_back::<NoopLogger>(NonNull::from(&*r), NonNull::from(&*e));
            NtNode::push_child_back::<NoopLogger>(NonNull::from(&*a), NonNull::from(&*b));
            NtNode::push_child_back::<NoopLogger>(NonNull::from(&*a), NonNull::from(&*d));
            NtNode::push_child_back::<NoopLogger>(NonNull::from(&*e), NonNull::from(&*f));
        }
        (r, a, c, e, b, d, f)
    }

    #[test]
    fn postorder_matches_seeded_scenario() {
        let (r, ..) = build_seeded_tree();
        let ids: Vec<_> = r.postorder().map(NtNode::id).collect();
        assert_eq!(ids, vec![5, 6, 2, 3, 7, 4, 1]);
    }

    #[test]
    fn preorder_visits_self_before_children() {
        let (r, ..) = build_seeded_tree();
        let ids: Vec<_> = r.preorder().map(NtNode::id).collect();
        assert_eq!(ids, vec![1, 2, 5, 6, 3, 4, 7]);
        assert_eq!(r.size(), 7);
    }

    #[test]
    fn find_locates_by_predicate() {
        let (r, ..) = build_seeded_tree();
        let found = r.find(|n| n.id() == 6).unwrap();
        assert_eq!(found.id(), 6);
        assert!(r.find(|n| n.id() == 99).is_none());
    }

    #[test]
    fn lca_of_cousins_is_their_grandparent() {
        let (r, a, _c, _e, b, d, f) = build_seeded_tree();
        assert_eq!(b.lca(&d).unwrap().id(), a.id());
        assert_eq!(b.lca(&f).unwrap().id(), r.id());
        assert_eq!(r.lca(&f).unwrap().id(), r.id());
    }

    #[test]
    fn lca_of_disjoint_trees_is_none() {
        let a = leaf(1);
        let b = leaf(2);
        assert!(a.lca(&b).is_none());
    }

    #[test]
    fn in_subtree_checks_ancestry() {
        let (r, a, _c, _e, b, ..) = build_seeded_tree();
        assert!(b.in_subtree(&a));
        assert!(b.in_subtree(&r));
        assert!(!a.in_subtree(&b));
    }

    #[test]
    fn siblings_excludes_self() {
        let (_r, a, c, e, ..) = build_seeded_tree();
        let ids: Vec<_> = a.siblings().map(NtNode::id).collect();
        assert_eq!(ids, vec![c.id(), e.id()]);
    }

    #[test]
    fn siblings_from_middle_child_wraps_circularly() {
        // R's children are [A, C, E]. Starting from the middle child C,
        // iteration must begin at its immediate successor E, then wrap back
        // around to A, stopping before reaching C again — not restart from
        // the front of the list.
        let (_r, a, c, e, ..) = build_seeded_tree();
        let ids: Vec<_> = c.siblings().map(NtNode::id).collect();
        assert_eq!(ids, vec![e.id(), a.id()]);
    }

    #[test]
    fn siblings_from_last_child_wraps_to_front() {
        let (_r, a, c, e, ..) = build_seeded_tree();
        let ids: Vec<_> = e.siblings().map(NtNode::id).collect();
        assert_eq!(ids, vec![a.id(), c.id()]);
    }

    #[test]
    fn siblings_of_only_child_is_empty() {
        let root = leaf(1);
        let only = leaf(2);
        unsafe {
            NtNode::push_child_back::<NoopLogger>(NonNull::from(&*root), NonNull::from(&*only));
        }
        assert_eq!(only.siblings().count(), 0);
    }

    #[test]
    fn next_and_prev_are_o1_sibling_steps() {
        let (_r, a, c, e, ..) = build_seeded_tree();
        assert_eq!(a.next().unwrap().id(), c.id());
        assert_eq!(c.next().unwrap().id(), e.id());
        assert!(e.next().is_none());

        assert!(a.prev().is_none());
        assert_eq!(c.prev().unwrap().id(), a.id());
        assert_eq!(e.prev().unwrap().id(), c.id());
    }

    #[test]
    fn next_prev_none_for_root() {
        let root = leaf(1);
        assert!(root.next().is_none());
        assert!(root.prev().is_none());
    }

    #[test]
    fn ancestors_excludes_self_up_to_root() {
        let (r, a, _c, _e, b, ..) = build_seeded_tree();
        let ids: Vec<_> = b.ancestors().map(NtNode::id).collect();
        assert_eq!(ids, vec![a.id(), r.id()]);
    }

    #[test]
    fn ancestors_at_includes_start_level() {
        let (r, a, _c, _e, b, ..) = build_seeded_tree();
        let ids: Vec<_> = b.ancestors_at(0).map(NtNode::id).collect();
        assert_eq!(ids, vec![b.id(), a.id(), r.id()]);

        let from_parent: Vec<_> = b.ancestors_at(1).map(NtNode::id).collect();
        assert_eq!(from_parent, vec![a.id(), r.id()]);
    }

    #[test]
    fn safe_removal_mid_postorder() {
        let (r, a, ..) = build_seeded_tree();
        let mut visited = Vec::new();
        for n in r.postorder() {
            visited.push(n.id());
        }
        assert_eq!(visited.len(), 7);
        unsafe {
            NtNode::remove::<NoopLogger>(NonNull::from(&*a));
        }
        assert!(a.is_root());
        assert_eq!(r.count(), 2);
    }

    #[test]
    fn destroy_fires_callbacks_in_postorder() {
        use std::cell::RefCell;
        thread_local! {
            static ORDER: RefCell<Vec<ObjectId>> = const { RefCell::new(Vec::new()) };
        }
        unsafe fn cb(node: &DNode, id: ObjectId) {
            let _ = node;
            ORDER.with(|o| o.borrow_mut().push(id));
        }

        let root = NtNode::boxed(Some(cb), 1);
        let child = NtNode::boxed(Some(cb), 2);
        let grandchild = NtNode::boxed(Some(cb), 3);
        unsafe {
            NtNode::push_child_back::<NoopLogger>(NonNull::from(&*root), NonNull::from(&*child));
            NtNode::push_child_back::<NoopLogger>(
                NonNull::from(&*child),
                NonNull::from(&*grandchild),
            );
            NtNode::destroy::<NoopLogger>(NonNull::from(&*root));
        }
        assert_eq!(ORDER.with(|o| o.borrow().clone()), vec![3, 2, 1]);
    }
}
