use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{DRAFT_KEY, POSTS_KEY};
use crate::core::errors::StoreError;
use crate::core::kv::KeyValue;
use crate::models::models::{FormDraft, Post};

/// Storage service for the draft mirror and the post list.
///
/// Every read goes back to the backend; nothing is cached between calls.
/// Read-modify-write sequences on one entry run under that entry's lock, so
/// concurrent requests sharing a store never drop each other's writes.
#[derive(Debug)]
pub struct FormStore<K> {
    kv: K,
    draft_lock: Mutex<()>,
    posts_lock: Mutex<()>,
}

fn acquire(lock: &Mutex<()>) -> Result<MutexGuard<'_, ()>, StoreError> {
    lock.lock().map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
}

impl<K: KeyValue> FormStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv, draft_lock: Mutex::new(()), posts_lock: Mutex::new(()) }
    }

    pub fn backend(&self) -> &K {
        &self.kv
    }

    /// Holds the draft entry for a load-modify-save sequence. Plain
    /// `get_draft`/`set_draft` calls do not take it.
    pub fn lock_draft(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        acquire(&self.draft_lock)
    }

    pub fn get_draft(&self) -> Result<Option<FormDraft>, StoreError> {
        self.kv.get_json(DRAFT_KEY)
    }

    /// Overwrites the whole draft entry.
    pub fn set_draft(&self, draft: &FormDraft) -> Result<(), StoreError> {
        debug!(fields = draft.iter().count(), "saving draft");
        self.kv.set_json(DRAFT_KEY, draft)
    }

    /// Returns posts in insertion order.
    ///
    /// Records written without an id get one here and the list is rewritten,
    /// so every post can be addressed by id afterwards.
    pub fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        let _guard = acquire(&self.posts_lock)?;
        self.load_posts()
    }

    /// Caller must hold `posts_lock`.
    fn load_posts(&self) -> Result<Vec<Post>, StoreError> {
        let mut posts: Vec<Post> = self.kv.get_json(POSTS_KEY)?.unwrap_or_default();

        let mut assigned = 0;
        for post in posts.iter_mut().filter(|p| p.id.is_empty()) {
            post.id = Uuid::new_v4().to_string();
            assigned += 1;
        }
        if assigned > 0 {
            info!(assigned, "assigned ids to legacy posts");
            self.kv.set_json(POSTS_KEY, &posts)?;
        }

        Ok(posts)
    }

    pub fn append_post(&self, mut post: Post) -> Result<Post, StoreError> {
        if post.id.is_empty() {
            post.id = Uuid::new_v4().to_string();
        }
        let _guard = acquire(&self.posts_lock)?;
        let mut posts = self.load_posts()?;
        posts.push(post.clone());
        self.kv.set_json(POSTS_KEY, &posts)?;
        info!(id = %post.id, total = posts.len(), "post stored");
        Ok(post)
    }

    /// Removes the post with `id`. Returns false when no post matched.
    pub fn delete_post(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = acquire(&self.posts_lock)?;
        let mut posts = self.load_posts()?;
        let Some(idx) = posts.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        posts.remove(idx);
        self.kv.set_json(POSTS_KEY, &posts)?;
        info!(id, remaining = posts.len(), "post deleted");
        Ok(true)
    }
}
