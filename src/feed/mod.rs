mod filter;

pub use filter::FeedFilter;

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use crate::{
    model::{Post, PostId},
    optimistic::{InFlight, LikeBook, LikeState},
    push::FeedEvent,
};

/// Outcome of a post-created event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Created {
    Inserted,
    /// Held back because the reader is scrolled away from the top.
    Buffered,
    Duplicate,
}

#[derive(Debug, Clone)]
struct Removed {
    post: Post,
    like: LikeState,
    comments: u32,
}

/// Local view of the feed: server truth merged with push deltas and
/// optimistic mutations. `posts` is always sorted newest first and never
/// holds an id twice, and no id is both listed and buffered.
#[derive(Debug, Clone)]
pub struct FeedReconciler {
    posts: Vec<Post>,
    pending: Vec<Post>,
    likes: LikeBook<PostId>,
    comment_counts: HashMap<PostId, u32>,
    deleting: InFlight<PostId, Removed>,
    at_top: bool,
    filter: FeedFilter,
}

impl Default for FeedReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedReconciler {
    pub fn new() -> Self {
        Self {
            posts: vec![],
            pending: vec![],
            likes: LikeBook::default(),
            comment_counts: HashMap::new(),
            deleting: InFlight::default(),
            at_top: true,
            filter: FeedFilter::default(),
        }
    }

    //==========================================================================
    // Server truth
    //==========================================================================
    pub fn seed(&mut self, posts: Vec<Post>) {
        let mut seen = HashSet::new();
        let mut posts: Vec<Post> = posts
            .into_iter()
            .rev()
            .filter(|post| seen.insert(post.id))
            .collect();
        sort_posts(&mut posts);
        // a delete in flight settles on its own snapshot
        posts.retain(|post| !self.deleting.is_pending(&post.id));

        self.pending.retain(|post| !seen.contains(&post.id));
        self.likes.reset(
            posts
                .iter()
                .chain(self.pending.iter())
                .map(|post| (post.id, LikeState::new(post.like_count, post.is_liked))),
        );
        self.comment_counts = posts
            .iter()
            .chain(self.pending.iter())
            .map(|post| (post.id, post.comment_count))
            .collect();

        debug!("Seeded feed with {} posts", posts.len());
        self.posts = posts;
    }

    //==========================================================================
    // Push deltas
    //==========================================================================
    pub fn apply_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Created(post) => {
                self.apply_created(post);
            }
            FeedEvent::Updated(post) => {
                self.apply_updated(post);
            }
            FeedEvent::Deleted(id) => {
                self.apply_deleted(id);
            }
            FeedEvent::LikeChanged {
                post_id,
                count,
                liked,
            } => {
                self.apply_like_delta(post_id, count, liked);
            }
        }
    }

    pub fn apply_created(&mut self, post: Post) -> Created {
        if self.contains(post.id) || self.deleting.is_pending(&post.id) {
            trace!("Post {} already known", post.id);
            return Created::Duplicate;
        }

        self.likes
            .set(post.id, LikeState::new(post.like_count, post.is_liked));
        self.comment_counts.insert(post.id, post.comment_count);

        if self.at_top {
            self.posts.push(post);
            sort_posts(&mut self.posts);
            Created::Inserted
        } else {
            self.pending.push(post);
            Created::Buffered
        }
    }

    /// Merges into a known post; unknown ids are ignored.
    pub fn apply_updated(&mut self, update: Post) -> bool {
        let id = update.id;
        let Some(post) = self
            .posts
            .iter_mut()
            .chain(self.pending.iter_mut())
            .find(|post| post.id == id)
        else {
            trace!("Ignoring update for unknown post {}", id);
            return false;
        };

        let is_liked = post.is_liked;
        *post = Post { is_liked, ..update };
        let (like_count, comment_count) = (post.like_count, post.comment_count);

        if !self.likes.is_pending(&id) {
            self.likes.merge(id, Some(like_count), None);
        }
        self.comment_counts.insert(id, comment_count);
        sort_posts(&mut self.posts);
        sort_posts(&mut self.pending);
        true
    }

    pub fn apply_deleted(&mut self, id: PostId) -> bool {
        let before = self.posts.len() + self.pending.len();
        self.posts.retain(|post| post.id != id);
        self.pending.retain(|post| post.id != id);
        self.likes.remove(&id);
        self.comment_counts.remove(&id);
        let was_deleting = self.deleting.settle(&id).is_some();

        before != self.posts.len() + self.pending.len() || was_deleting
    }

    pub fn apply_like_delta(&mut self, id: PostId, count: Option<u32>, liked: Option<bool>) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.likes.merge(id, count, liked);
        true
    }

    //==========================================================================
    // Viewport
    //==========================================================================
    /// Records whether the reader is at the top; returning there flushes the
    /// buffer. Returns the number of posts inserted.
    pub fn set_at_top(&mut self, at_top: bool) -> usize {
        let was_at_top = self.at_top;
        self.at_top = at_top;
        if at_top && !was_at_top {
            self.flush()
        } else {
            0
        }
    }

    /// Inserts every buffered post at once. The view scrolls to the top.
    pub fn flush(&mut self) -> usize {
        let mut known: HashSet<PostId> = self.posts.iter().map(|post| post.id).collect();
        let mut inserted = 0;
        for post in std::mem::take(&mut self.pending) {
            if known.insert(post.id) {
                self.posts.push(post);
                inserted += 1;
            }
        }
        sort_posts(&mut self.posts);
        self.at_top = true;

        if inserted > 0 {
            debug!("Flushed {} new posts", inserted);
        }
        inserted
    }

    pub fn is_at_top(&self) -> bool {
        self.at_top
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    //==========================================================================
    // Reads
    //==========================================================================
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn contains(&self, id: PostId) -> bool {
        self.posts.iter().chain(self.pending.iter()).any(|post| post.id == id)
    }

    pub fn get(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    /// Posts passing the local filter preview.
    pub fn visible(&self) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|post| self.filter.matches(post))
            .collect()
    }

    pub fn filter(&self) -> &FeedFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: FeedFilter) {
        self.filter = filter;
    }

    pub fn like(&self, id: PostId) -> LikeState {
        self.likes.get(&id)
    }

    pub fn like_pending(&self, id: PostId) -> bool {
        self.likes.is_pending(&id)
    }

    pub fn comment_count(&self, id: PostId) -> u32 {
        self.comment_counts.get(&id).copied().unwrap_or_default()
    }

    pub fn adjust_comment_count(&mut self, id: PostId, delta: i64) {
        if let Some(count) = self.comment_counts.get_mut(&id) {
            *count = (*count as i64 + delta).max(0) as u32;
        }
    }

    /// Tag usage over the loaded list, most used first.
    pub fn popular_tags(&self, limit: usize) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for tag in self.posts.iter().flat_map(|post| post.tags.iter()) {
            *counts.entry(tag.name.as_str()).or_default() += 1;
        }
        let mut tags: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        tags.truncate(limit);
        tags
    }

    //==========================================================================
    // Optimistic mutations
    //==========================================================================
    pub fn begin_like_toggle(&mut self, id: PostId) -> Option<LikeState> {
        if !self.contains(id) {
            return None;
        }
        self.likes.begin_toggle(id)
    }

    pub fn commit_like(&mut self, id: PostId, server: LikeState) {
        self.likes.commit(id, server);
    }

    pub fn rollback_like(&mut self, id: PostId) -> Option<LikeState> {
        self.likes.rollback(id)
    }

    /// Removes the post locally, keeping a snapshot until the delete settles.
    pub fn begin_delete(&mut self, id: PostId) -> bool {
        let Some(index) = self.posts.iter().position(|post| post.id == id) else {
            return false;
        };
        let removed = Removed {
            post: self.posts[index].clone(),
            like: self.likes.get(&id),
            comments: self.comment_count(id),
        };
        if !self.deleting.begin(id, removed) {
            return false;
        }
        self.posts.remove(index);
        true
    }

    pub fn commit_delete(&mut self, id: PostId) {
        self.deleting.settle(&id);
        self.likes.remove(&id);
        self.comment_counts.remove(&id);
    }

    pub fn rollback_delete(&mut self, id: PostId) -> bool {
        let Some(Removed {
            post,
            like,
            comments,
        }) = self.deleting.settle(&id)
        else {
            return false;
        };
        if self.contains(id) {
            return false;
        }
        self.posts.push(post);
        sort_posts(&mut self.posts);
        self.likes.set(id, like);
        self.comment_counts.insert(id, comments);
        true
    }
}

/// Newest first, id descending on equal timestamps. Stable.
pub fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{post, Tag};

    fn ids(feed: &FeedReconciler) -> Vec<PostId> {
        feed.posts().iter().map(|post| post.id).collect()
    }

    fn assert_consistent(feed: &FeedReconciler) {
        let ids = ids(feed);
        let unique: HashSet<PostId> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len(), "duplicate ids in {:?}", ids);

        for pair in feed.posts().windows(2) {
            let ordered = pair[0].created_at > pair[1].created_at
                || (pair[0].created_at == pair[1].created_at && pair[0].id > pair[1].id);
            assert!(ordered, "out of order: {} before {}", pair[0].id, pair[1].id);
        }
    }

    fn seeded() -> FeedReconciler {
        let mut feed = FeedReconciler::new();
        feed.seed(vec![post(1, "2024-01-02"), post(2, "2024-01-01")]);
        feed
    }

    #[test]
    fn created_at_top_is_inserted_once() {
        let mut feed = seeded();
        assert_eq!(feed.apply_created(post(3, "2024-01-03")), Created::Inserted);
        assert_eq!(ids(&feed), vec![3, 1, 2]);

        assert_eq!(feed.apply_created(post(3, "2024-01-03")), Created::Duplicate);
        assert_eq!(ids(&feed), vec![3, 1, 2]);
    }

    #[test]
    fn ties_break_on_id() {
        let mut feed = FeedReconciler::new();
        feed.seed(vec![
            post(4, "2024-01-01"),
            post(9, "2024-01-01"),
            post(5, "2024-01-02"),
        ]);
        assert_eq!(ids(&feed), vec![5, 9, 4]);
    }

    #[test]
    fn seed_deduplicates() {
        let mut feed = FeedReconciler::new();
        let mut newer = post(1, "2024-01-05");
        newer.title = "edited".to_string();
        feed.seed(vec![post(1, "2024-01-01"), post(2, "2024-01-02"), newer]);
        assert_eq!(ids(&feed), vec![1, 2]);
        assert_eq!(feed.get(1).unwrap().title, "edited");
    }

    #[test]
    fn buffered_until_flush() {
        let mut feed = seeded();
        feed.set_at_top(false);

        assert_eq!(feed.apply_created(post(3, "2024-01-03")), Created::Buffered);
        assert_eq!(feed.apply_created(post(4, "2024-01-04")), Created::Buffered);
        assert_eq!(feed.apply_created(post(4, "2024-01-04")), Created::Duplicate);
        assert_eq!(feed.pending_count(), 2);
        assert_eq!(ids(&feed), vec![1, 2]);

        assert_eq!(feed.set_at_top(true), 2);
        assert_eq!(ids(&feed), vec![4, 3, 1, 2]);
        assert_eq!(feed.pending_count(), 0);
        assert_consistent(&feed);
    }

    #[test]
    fn flush_skips_ids_already_listed() {
        let mut feed = seeded();
        feed.set_at_top(false);
        feed.apply_created(post(3, "2024-01-03"));

        // A re-seed brings 3 in through the REST path while it is buffered.
        feed.seed(vec![
            post(3, "2024-01-03"),
            post(1, "2024-01-02"),
            post(2, "2024-01-01"),
        ]);
        assert_eq!(feed.pending_count(), 0);
        assert_eq!(feed.flush(), 0);
        assert_eq!(ids(&feed), vec![3, 1, 2]);
        assert!(feed.is_at_top());
    }

    #[test]
    fn update_merges_known_and_ignores_unknown() {
        let mut feed = seeded();
        feed.begin_like_toggle(1);

        let mut update = post(1, "2024-01-02");
        update.title = "new title".to_string();
        update.is_liked = false;
        update.like_count = 40;
        assert!(feed.apply_updated(update));

        let updated = feed.get(1).unwrap();
        assert_eq!(updated.title, "new title");
        // optimistic like survives the merge
        assert_eq!(feed.like(1), LikeState::new(1, true));

        assert!(!feed.apply_updated(post(99, "2024-01-09")));
        assert_eq!(ids(&feed), vec![1, 2]);
    }

    #[test]
    fn update_reorders_when_timestamp_changes() {
        let mut feed = seeded();
        assert!(feed.apply_updated(post(2, "2024-01-05")));
        assert_eq!(ids(&feed), vec![2, 1]);
    }

    #[test]
    fn delete_clears_every_collection() {
        let mut feed = seeded();
        feed.set_at_top(false);
        feed.apply_created(post(3, "2024-01-03"));
        feed.apply_like_delta(3, Some(8), None);

        assert!(feed.apply_deleted(3));
        assert!(feed.apply_deleted(1));
        assert_eq!(feed.pending_count(), 0);
        assert_eq!(ids(&feed), vec![2]);
        assert_eq!(feed.like(3), LikeState::default());
        assert_eq!(feed.comment_count(1), 0);
        assert!(!feed.apply_like_delta(3, Some(1), None));
        assert!(!feed.apply_deleted(3));
    }

    #[test]
    fn like_delta_is_partial() {
        let mut feed = FeedReconciler::new();
        let mut liked = post(1, "2024-01-01");
        liked.like_count = 3;
        liked.is_liked = true;
        feed.seed(vec![liked]);

        feed.apply_like_delta(1, Some(4), None);
        assert_eq!(feed.like(1), LikeState::new(4, true));
        feed.apply_like_delta(1, None, Some(false));
        assert_eq!(feed.like(1), LikeState::new(4, false));
        assert_eq!(feed.get(1).unwrap().title, "post 1");
    }

    #[test]
    fn like_toggle_rolls_back_on_failure() {
        let mut feed = FeedReconciler::new();
        let mut target = post(1, "2024-01-01");
        target.like_count = 5;
        feed.seed(vec![target]);

        assert_eq!(feed.begin_like_toggle(1), Some(LikeState::new(6, true)));
        assert_eq!(feed.begin_like_toggle(1), None);
        assert_eq!(feed.rollback_like(1), Some(LikeState::new(5, false)));
        assert_eq!(feed.like(1), LikeState::new(5, false));
    }

    #[test]
    fn optimistic_delete_and_rollback() {
        let mut feed = seeded();
        feed.apply_like_delta(2, Some(7), Some(true));

        assert!(feed.begin_delete(2));
        assert!(!feed.begin_delete(2));
        assert_eq!(ids(&feed), vec![1]);
        // creation replayed while the delete is in flight
        assert_eq!(feed.apply_created(post(2, "2024-01-01")), Created::Duplicate);

        assert!(feed.rollback_delete(2));
        assert_eq!(ids(&feed), vec![1, 2]);
        assert_eq!(feed.like(2), LikeState::new(7, true));

        assert!(feed.begin_delete(2));
        feed.commit_delete(2);
        assert!(!feed.rollback_delete(2));
        assert_eq!(ids(&feed), vec![1]);
    }

    #[test]
    fn reload_keeps_pending_delete() {
        let mut feed = seeded();
        assert!(feed.begin_delete(2));

        feed.seed(vec![post(1, "2024-01-02"), post(2, "2024-01-01"), post(3, "2024-01-03")]);
        assert_eq!(ids(&feed), vec![3, 1]);
        assert!(!feed.begin_delete(2));

        assert!(feed.rollback_delete(2));
        assert_eq!(ids(&feed), vec![3, 1, 2]);
    }

    #[test]
    fn pushed_delete_wins_over_pending_delete() {
        let mut feed = seeded();
        assert!(feed.begin_delete(1));
        assert!(feed.apply_deleted(1));
        assert!(!feed.rollback_delete(1));
        assert_eq!(ids(&feed), vec![2]);
    }

    #[test]
    fn random_sequences_stay_sorted_and_unique() {
        // xorshift, deterministic
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        let mut feed = FeedReconciler::new();
        feed.seed(vec![post(1, "2024-01-01")]);
        for _ in 0..2_000 {
            let id = (next() % 25) as PostId;
            let day = 1 + next() % 28;
            let date = format!("2024-02-{:02}", day);
            match next() % 6 {
                0 | 1 => {
                    feed.apply_created(post(id, &date));
                }
                2 => {
                    feed.apply_updated(post(id, &date));
                }
                3 => {
                    feed.apply_deleted(id);
                }
                4 => {
                    feed.set_at_top(next() % 2 == 0);
                }
                _ => {
                    feed.flush();
                }
            }
            assert_consistent(&feed);
            for pending in &feed.pending {
                assert!(!feed.posts.iter().any(|post| post.id == pending.id));
            }
        }
    }

    #[test]
    fn popular_tags_by_usage() {
        let tag = |name: &str| Tag {
            id: 0,
            name: name.to_string(),
            count: None,
        };
        let mut a = post(1, "2024-01-01");
        a.tags = vec![tag("rust"), tag("tui")];
        let mut b = post(2, "2024-01-02");
        b.tags = vec![tag("rust"), tag("async")];

        let mut feed = FeedReconciler::new();
        feed.seed(vec![a, b]);
        assert_eq!(
            feed.popular_tags(2),
            vec![("rust".to_string(), 2), ("async".to_string(), 1)]
        );
    }

    #[test]
    fn visible_applies_local_filter() {
        let mut feed = seeded();
        feed.set_filter(FeedFilter::parse("to:2024-01-01").unwrap());
        let visible: Vec<PostId> = feed.visible().iter().map(|post| post.id).collect();
        assert_eq!(visible, vec![2]);
    }
}
