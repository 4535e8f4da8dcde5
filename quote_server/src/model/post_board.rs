//! In-memory post collection served by the mock API.
//!
//! The board is seeded with a fixed set of posts. Created posts get ids starting
//! at `FIRST_CREATED_ID`, like the public placeholder API it mimics.
//! The board is not synchronized; share it behind a
//! `Mutex` when several threads touch it.

use quote_common::{Post, PostDraft};

/// First id handed out to posts created through the API.
pub const FIRST_CREATED_ID: i64 = 101;

const SEED: &[(&str, &str)] = &[
    (
        "Life lessons from the harbour",
        "The sea does not reward those who are too anxious.\nIt rewards the patient.",
    ),
    (
        "Work is a craft",
        "Measure twice and cut once.\nThen sand the edges anyway.",
    ),
    (
        "Courage in small doses",
        "Courage is mostly showing up a second time.",
    ),
    (
        "Wisdom of the old gardener",
        "Weeds grow without permission; roses need a plan.",
    ),
    (
        "Patience and bread",
        "Good dough cannot be hurried.\nNeither can good decisions.",
    ),
    (
        "Life after the storm",
        "Every roof looks different once it has held.",
    ),
    (
        "Work with your hands",
        "The tool remembers what the manual forgets.",
    ),
    (
        "Wisdom at the crossroads",
        "Either road is shorter once you start walking.",
    ),
];

/// Posts served by the mock API.
pub struct PostBoard {
    posts: Vec<Post>,
    next_id: i64,
}

impl PostBoard {
    /// Creates a board holding the built-in seed posts, all last revised at `now`.
    pub fn seeded(now: i64) -> Self {
        let posts = SEED
            .iter()
            .enumerate()
            .map(|(index, (title, body))| Post {
                id: index as i64 + 1,
                user_id: 1,
                title: title.to_string(),
                body: body.to_string(),
                updated_at: Some(now),
            })
            .collect();
        Self {
            posts,
            next_id: FIRST_CREATED_ID,
        }
    }

    /// First `limit` posts in id order.
    pub fn list(&self, limit: usize) -> Vec<Post> {
        self.posts.iter().take(limit).cloned().collect()
    }

    /// Stores a new post and returns it with its assigned id.
    pub fn create(&mut self, draft: PostDraft, now: i64) -> Post {
        let post = Post {
            id: self.next_id,
            user_id: draft.user_id,
            title: draft.title,
            body: draft.body,
            updated_at: Some(now),
        };
        self.next_id += 1;
        self.posts.push(post.clone());
        post
    }

    /// Replaces the body of post `id` and bumps its revision time.
    ///
    /// Returns `false` when no such post exists.
    pub fn revise(&mut self, id: i64, body: &str, now: i64) -> bool {
        match self.posts.iter_mut().find(|post| post.id == id) {
            Some(post) => {
                post.body = body.to_string();
                post.updated_at = Some(now);
                true
            }
            None => false,
        }
    }

    /// Ids of all stored posts.
    pub fn ids(&self) -> Vec<i64> {
        self.posts.iter().map(|post| post.id).collect()
    }

    /// Number of stored posts.
    pub fn len(&self) -> usize {
        self.posts.len()
    }
}
