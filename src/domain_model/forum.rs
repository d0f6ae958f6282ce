use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub i64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub i64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub username: String, // empty when the user service could not resolve it
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub author_id: UserId,
    pub post_id: PostId,
    pub content: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentDraft {
    pub content: String,
}

/// Which collection a list view follows.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ListScope {
    Posts,
    Comments(PostId),
}

impl fmt::Display for ListScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListScope::Posts => f.write_str("posts"),
            ListScope::Comments(post) => write!(f, "comments of post {post}"),
        }
    }
}
