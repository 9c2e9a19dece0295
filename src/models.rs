use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::entities::{question, tag, user};

// --- Inputs ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuestionParams {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditQuestionParams {
    pub question_id: i32,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedSearchParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub query: Option<String>,
    pub filter: Option<String>,
}

/// Question input after boundary validation: trimmed text, normalized distinct tag names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionInput {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// Offset pagination after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// True when rows remain past this page.
    pub fn has_next(&self, total: u64, returned: usize) -> bool {
        total > self.offset().saturating_add(returned as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionFilter {
    Newest,
    Unanswered,
    Popular,
}

impl QuestionFilter {
    /// Unknown or missing filters sort newest first.
    pub fn parse(filter: Option<&str>) -> Self {
        match filter {
            Some("unanswered") => QuestionFilter::Unanswered,
            Some("popular") => QuestionFilter::Popular,
            _ => QuestionFilter::Newest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFilter {
    Popular,
    Recent,
    Oldest,
    Name,
}

impl TagFilter {
    pub fn parse(filter: Option<&str>) -> Self {
        match filter {
            Some("recent") => TagFilter::Recent,
            Some("oldest") => TagFilter::Oldest,
            Some("name") => TagFilter::Name,
            _ => TagFilter::Popular,
        }
    }
}

// --- Outputs ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: i32,
    pub name: String,
}

impl From<&tag::Model> for TagRef {
    fn from(tag: &tag::Model) -> Self {
        Self {
            id: tag.id,
            name: tag.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
}

impl From<&user::Model> for AuthorRef {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            image: user.image.clone(),
        }
    }
}

/// A question with its tag references and author resolved inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub tags: Vec<TagRef>,
    pub author: AuthorRef,
    pub upvotes: i32,
    pub downvotes: i32,
    pub answers: i32,
    pub views: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuestionView {
    pub fn assemble(question: question::Model, mut tags: Vec<TagRef>, author: AuthorRef) -> Self {
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            id: question.id,
            title: question.title,
            content: question.content,
            tags,
            author,
            upvotes: question.upvotes,
            downvotes: question.downvotes,
            answers: question.answers,
            views: question.views,
            created_at: question.created_at,
            updated_at: question.updated_at,
        }
    }

    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagView {
    pub id: i32,
    pub name: String,
    pub question_count: i32,
    pub created_at: DateTime<Utc>,
}

impl From<tag::Model> for TagView {
    fn from(tag: tag::Model) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            question_count: tag.question_count,
            created_at: tag.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i32,
    pub name: String,
    pub username: String,
    pub image: Option<String>,
}

impl From<user::Model> for UserView {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            image: user.image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagQuestions {
    pub tag: TagView,
    pub questions: Vec<QuestionView>,
    pub has_next: bool,
}

/// Returned by `add-user`: the stored user plus a bearer token for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub user: UserView,
    pub token: String,
}
