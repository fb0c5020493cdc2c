pub mod tree;

use std::collections::HashSet;

use log::{debug, warn};

use crate::{
    model::{Comment, CommentId, PostId},
    optimistic::{InFlight, LikeBook, LikeState},
};

use tree::TreeNode;

#[derive(Debug, Clone, PartialEq)]
pub struct CommentNode {
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn new(comment: Comment) -> Self {
        Self {
            comment,
            replies: vec![],
        }
    }
}

impl TreeNode for CommentNode {
    type Id = CommentId;

    fn id(&self) -> CommentId {
        self.comment.id
    }
    fn children(&self) -> &[Self] {
        &self.replies
    }
    fn children_mut(&mut self) -> &mut Vec<Self> {
        &mut self.replies
    }
}

/// What the caller has to do after a node was toggled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expand {
    /// Expanded, replies are not cached yet: fetch them.
    Fetch(CommentId),
    Expanded,
    Collapsed,
}

/// One visible line of the thread.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    pub depth: usize,
    pub comment: &'a Comment,
    pub expanded: bool,
    pub loading: bool,
    pub like: LikeState,
}

#[derive(Debug, Clone)]
struct Removed {
    parent: Option<CommentId>,
    index: usize,
    node: CommentNode,
}

/// Reply tree of one post. Replies are fetched lazily per parent and stay
/// cached when the parent is collapsed.
#[derive(Debug, Clone)]
pub struct CommentThread {
    post_id: PostId,
    roots: Vec<CommentNode>,
    expanded: HashSet<CommentId>,
    loaded: HashSet<CommentId>,
    loading: HashSet<CommentId>,
    likes: LikeBook<CommentId>,
    deleting: InFlight<CommentId, Removed>,
}

impl CommentThread {
    /// Builds the thread from the comments shipped with a post. Replies
    /// included there are nested under their parent.
    pub fn new(post_id: PostId, comments: Vec<Comment>) -> Self {
        let mut thread = Self {
            post_id,
            roots: vec![],
            expanded: HashSet::new(),
            loaded: HashSet::new(),
            loading: HashSet::new(),
            likes: LikeBook::default(),
            deleting: InFlight::default(),
        };
        let (roots, replies): (Vec<Comment>, Vec<Comment>) = comments
            .into_iter()
            .partition(|comment| comment.parent_comment_id.is_none());
        for comment in roots.into_iter().chain(replies) {
            thread.add(comment);
        }
        thread
    }

    pub fn roots(&self) -> &[CommentNode] {
        &self.roots
    }

    pub fn get(&self, id: CommentId) -> Option<&Comment> {
        tree::find(&self.roots, id).map(|node| &node.comment)
    }

    pub fn len(&self) -> usize {
        tree::ids(&self.roots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn is_expanded(&self, id: CommentId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn is_loaded(&self, id: CommentId) -> bool {
        self.loaded.contains(&id)
    }

    /// Visible lines, descending only into expanded nodes.
    pub fn rows(&self) -> Vec<Row<'_>> {
        tree::flatten(&self.roots, &|node: &CommentNode| {
            self.expanded.contains(&node.comment.id)
        })
        .into_iter()
        .map(|(depth, node)| {
            let id = node.comment.id;
            Row {
                depth,
                comment: &node.comment,
                expanded: self.expanded.contains(&id),
                loading: self.loading.contains(&id),
                like: self.likes.get(&id),
            }
        })
        .collect()
    }

    //==========================================================================
    // Expansion & lazy replies
    //==========================================================================
    pub fn toggle(&mut self, id: CommentId) -> Expand {
        if tree::find(&self.roots, id).is_none() {
            return Expand::Collapsed;
        }
        if self.expanded.remove(&id) {
            return Expand::Collapsed;
        }
        self.expanded.insert(id);
        if self.loaded.contains(&id) || !self.loading.insert(id) {
            Expand::Expanded
        } else {
            Expand::Fetch(id)
        }
    }

    /// Caches fetched replies under `parent`, merging with replies already
    /// present (e.g. ones posted locally before the fetch). Replies being
    /// deleted or already shown elsewhere in the thread are skipped.
    pub fn attach_replies(&mut self, parent: CommentId, replies: Vec<Comment>) -> bool {
        self.loading.remove(&parent);
        let replies: Vec<Comment> = replies
            .into_iter()
            .filter(|reply| {
                if self.deleting.is_pending(&reply.id) {
                    return false;
                }
                match tree::locate(&self.roots, reply.id) {
                    None => true,
                    Some((at, _)) => at == Some(parent),
                }
            })
            .collect();
        let Some(node) = tree::find_mut(&mut self.roots, parent) else {
            debug!("Dropping replies of removed comment {} on post {}", parent, self.post_id);
            return false;
        };

        for reply in replies {
            if let Some(existing) = node.replies.iter_mut().find(|n| n.comment.id == reply.id) {
                existing.comment = reply;
            } else {
                self.likes
                    .set(reply.id, LikeState::new(reply.like_count, reply.is_liked));
                node.replies.push(CommentNode::new(reply));
            }
        }
        node.replies.sort_by(|a, b| {
            a.comment
                .created_at
                .cmp(&b.comment.created_at)
                .then_with(|| a.comment.id.cmp(&b.comment.id))
        });
        self.loaded.insert(parent);
        true
    }

    /// The fetch failed: collapse again so the user can retry.
    pub fn replies_failed(&mut self, parent: CommentId) {
        self.loading.remove(&parent);
        self.expanded.remove(&parent);
    }

    //==========================================================================
    // Mutations
    //==========================================================================
    /// Inserts a new comment under its parent, or at the root.
    pub fn add(&mut self, comment: Comment) -> bool {
        if self.deleting.is_pending(&comment.id)
            || tree::find(&self.roots, comment.id).is_some()
        {
            return false;
        }
        let like = LikeState::new(comment.like_count, comment.is_liked);
        let id = comment.id;
        let parent = comment.parent_comment_id;
        let index = usize::MAX;

        match tree::insert(&mut self.roots, parent, index, CommentNode::new(comment)) {
            Ok(()) => {}
            Err(orphan) => {
                warn!(
                    "Parent {:?} of comment {} not found, showing it at the top level",
                    parent, id
                );
                self.roots.push(orphan);
            }
        }
        self.likes.set(id, like);
        true
    }

    pub fn edit(&mut self, id: CommentId, text: &str) -> bool {
        tree::update(&mut self.roots, id, |node| node.comment.text = text.to_string())
    }

    /// Detaches the comment and its replies until the delete settles.
    pub fn begin_delete(&mut self, id: CommentId) -> bool {
        if self.deleting.is_pending(&id) {
            return false;
        }
        let Some((parent, index)) = tree::locate(&self.roots, id) else {
            return false;
        };
        let Some(node) = tree::remove(&mut self.roots, id) else {
            return false;
        };
        self.deleting.begin(
            id,
            Removed {
                parent,
                index,
                node,
            },
        )
    }

    /// Returns how many comments went away with the deleted one.
    pub fn commit_delete(&mut self, id: CommentId) -> usize {
        let Some(removed) = self.deleting.settle(&id) else {
            return 0;
        };
        let gone = tree::ids(std::slice::from_ref(&removed.node));
        for id in &gone {
            self.likes.remove(id);
            self.expanded.remove(id);
            self.loaded.remove(id);
            self.loading.remove(id);
        }
        gone.len()
    }

    pub fn rollback_delete(&mut self, id: CommentId) -> bool {
        let Some(Removed {
            parent,
            index,
            mut node,
        }) = self.deleting.settle(&id)
        else {
            return false;
        };

        let shown: HashSet<CommentId> = tree::ids(&self.roots).into_iter().collect();
        if shown.contains(&id) {
            debug!("Comment {} is back already, dropping its snapshot", id);
            return false;
        }
        for dup in tree::ids(&node.replies) {
            if shown.contains(&dup) {
                tree::remove(&mut node.replies, dup);
            }
        }
        tree::insert(&mut self.roots, parent, index, node).is_ok()
    }

    pub fn like(&self, id: CommentId) -> LikeState {
        self.likes.get(&id)
    }

    pub fn begin_like_toggle(&mut self, id: CommentId) -> Option<LikeState> {
        tree::find(&self.roots, id)?;
        self.likes.begin_toggle(id)
    }

    pub fn commit_like(&mut self, id: CommentId, server: LikeState) {
        self.likes.commit(id, server);
    }

    pub fn rollback_like(&mut self, id: CommentId) -> Option<LikeState> {
        self.likes.rollback(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::comment;

    // 1 ── 2 ── 3 ── 4
    //      │    └─── 5
    //      └─── 6
    fn deep() -> CommentThread {
        let mut thread = CommentThread::new(1, vec![comment(1, None, "root")]);
        assert_eq!(thread.toggle(1), Expand::Fetch(1));
        thread.attach_replies(1, vec![comment(2, Some(1), "a"), comment(6, Some(1), "b")]);
        assert_eq!(thread.toggle(2), Expand::Fetch(2));
        thread.attach_replies(2, vec![comment(3, Some(2), "c")]);
        assert_eq!(thread.toggle(3), Expand::Fetch(3));
        thread.attach_replies(3, vec![comment(4, Some(3), "d"), comment(5, Some(3), "e")]);
        thread
    }

    fn visible(thread: &CommentThread) -> Vec<(usize, CommentId)> {
        thread
            .rows()
            .iter()
            .map(|row| (row.depth, row.comment.id))
            .collect()
    }

    #[test]
    fn builds_nested_from_detail() {
        let thread = CommentThread::new(
            1,
            vec![
                comment(11, Some(10), "reply"),
                comment(10, None, "top"),
                comment(12, Some(99), "orphan"),
            ],
        );
        assert_eq!(tree::ids(thread.roots()), vec![10, 11, 12]);
        assert_eq!(thread.len(), 3);
    }

    #[test]
    fn collapse_keeps_cached_replies() {
        let mut thread = deep();
        assert_eq!(visible(&thread), vec![(0, 1), (1, 2), (2, 3), (3, 4), (3, 5), (1, 6)]);

        assert_eq!(thread.toggle(2), Expand::Collapsed);
        assert_eq!(visible(&thread), vec![(0, 1), (1, 2), (1, 6)]);
        assert_eq!(thread.len(), 6);

        // cached: no second fetch
        assert_eq!(thread.toggle(2), Expand::Expanded);
        assert_eq!(visible(&thread).len(), 6);
    }

    #[test]
    fn toggle_while_loading_does_not_refetch() {
        let mut thread = CommentThread::new(1, vec![comment(1, None, "root")]);
        assert_eq!(thread.toggle(1), Expand::Fetch(1));
        assert_eq!(thread.toggle(1), Expand::Collapsed);
        assert_eq!(thread.toggle(1), Expand::Expanded);
        assert!(thread.rows()[0].loading);

        thread.replies_failed(1);
        assert!(!thread.is_expanded(1));
        assert_eq!(thread.toggle(1), Expand::Fetch(1));
    }

    #[test]
    fn edit_deep_reply_only() {
        let mut thread = deep();
        let before = thread.roots().to_vec();

        assert!(thread.edit(4, "edited"));
        assert_eq!(thread.get(4).unwrap().text, "edited");

        let mut expected = before;
        expected[0].replies[0].replies[0].replies[0].comment.text = "edited".to_string();
        assert_eq!(thread.roots(), expected.as_slice());
        assert!(!thread.edit(42, "nope"));
    }

    #[test]
    fn delete_deep_reply_only() {
        let mut thread = deep();
        let before = thread.roots().to_vec();

        assert!(thread.begin_delete(4));
        assert_eq!(thread.commit_delete(4), 1);

        let mut expected = before;
        expected[0].replies[0].replies[0].replies.remove(0);
        assert_eq!(thread.roots(), expected.as_slice());
        assert!(thread.get(4).is_none());
    }

    #[test]
    fn failed_delete_restores_subtree_in_place() {
        let mut thread = deep();
        let before = thread.roots().to_vec();

        assert!(thread.begin_delete(2));
        assert!(!thread.begin_delete(2));
        assert_eq!(visible(&thread), vec![(0, 1), (1, 6)]);

        assert!(thread.rollback_delete(2));
        assert_eq!(thread.roots(), before.as_slice());
    }

    #[test]
    fn replies_merge_with_local_additions() {
        let mut thread = CommentThread::new(1, vec![comment(1, None, "root")]);
        thread.add(comment(3, Some(1), "mine"));
        assert!(!thread.is_loaded(1));

        thread.toggle(1);
        thread.attach_replies(1, vec![comment(2, Some(1), "x"), comment(3, Some(1), "mine")]);
        assert_eq!(tree::ids(thread.roots()), vec![1, 2, 3]);
        assert!(!thread.add(comment(2, Some(1), "dup")));
    }

    #[test]
    fn refetch_during_delete_keeps_ids_unique() {
        let mut thread = CommentThread::new(1, vec![comment(1, None, "root")]);
        thread.add(comment(3, Some(1), "mine"));
        assert!(thread.begin_delete(3));

        assert_eq!(thread.toggle(1), Expand::Fetch(1));
        thread.attach_replies(1, vec![comment(3, Some(1), "mine"), comment(4, Some(1), "other")]);
        assert_eq!(tree::ids(thread.roots()), vec![1, 4]);
        assert!(!thread.add(comment(3, Some(1), "mine")));

        assert!(thread.rollback_delete(3));
        assert_eq!(tree::ids(thread.roots()), vec![1, 3, 4]);
    }

    #[test]
    fn rollback_drops_replies_shown_again() {
        let mut thread = deep();
        assert!(thread.begin_delete(2));
        assert!(!thread.add(comment(2, Some(1), "a")));

        // parent 3 is detached, so this lands as an orphan root
        assert!(thread.add(comment(4, Some(3), "d")));
        assert!(thread.rollback_delete(2));
        assert_eq!(tree::ids(thread.roots()), vec![1, 2, 3, 5, 6, 4]);
    }

    #[test]
    fn comment_like_rollback() {
        let mut thread = deep();
        assert_eq!(thread.begin_like_toggle(5), Some(LikeState::new(1, true)));
        assert_eq!(thread.begin_like_toggle(5), None);
        thread.rollback_like(5);
        assert_eq!(thread.like(5), LikeState::new(0, false));
        assert_eq!(thread.begin_like_toggle(77), None);
    }
}
