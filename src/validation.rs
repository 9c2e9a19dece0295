//! Boundary checks for incoming question, tag and pagination inputs.

use std::collections::HashSet;

use crate::config::QuestionLimits;
use crate::error::{AppError, FieldErrors};
use crate::models::{PageRequest, PaginatedSearchParams, QuestionInput};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;
// Offsets are bound as signed 64-bit integers by the store.
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Tag names are matched case-sensitively in the store, so every caller goes through here first.
pub fn normalize_tag(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn validate_question(
    title: &str,
    content: &str,
    tags: &[String],
    limits: &QuestionLimits,
) -> Result<QuestionInput, AppError> {
    let mut errors = FieldErrors::new();

    let title = title.trim();
    let title_len = title.chars().count();
    if title_len == 0 {
        errors.add("title", "Title is required.");
    } else if title_len < limits.title_min_len {
        errors.add(
            "title",
            format!("Title must be at least {} characters.", limits.title_min_len),
        );
    } else if title_len > limits.title_max_len {
        errors.add(
            "title",
            format!("Title cannot exceed {} characters.", limits.title_max_len),
        );
    }

    let content = content.trim();
    let content_len = content.chars().count();
    if content_len == 0 {
        errors.add("content", "Body is required.");
    } else if content_len < limits.content_min_len {
        errors.add(
            "content",
            format!("Body must be at least {} characters.", limits.content_min_len),
        );
    } else if content_len > limits.content_max_len {
        errors.add(
            "content",
            format!("Body cannot exceed {} characters.", limits.content_max_len),
        );
    }

    let normalized = validate_tags(tags, limits, &mut errors);

    errors.into_result()?;
    Ok(QuestionInput {
        title: title.to_string(),
        content: content.to_string(),
        tags: normalized,
    })
}

fn validate_tags(tags: &[String], limits: &QuestionLimits, errors: &mut FieldErrors) -> Vec<String> {
    if tags.is_empty() {
        errors.add("tags", "At least one tag is required.");
        return Vec::new();
    }
    if tags.len() > limits.max_tags {
        errors.add("tags", format!("Cannot add more than {} tags.", limits.max_tags));
    }

    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(tags.len());
    for raw in tags {
        let name = normalize_tag(raw);
        if name.is_empty() {
            errors.add("tags", "Tag is required.");
            continue;
        }
        if name.chars().count() > limits.tag_max_len {
            errors.add(
                "tags",
                format!("Tag cannot exceed {} characters.", limits.tag_max_len),
            );
            continue;
        }
        if !seen.insert(name.clone()) {
            errors.add("tags", format!("Duplicate tag: {name}."));
            continue;
        }
        normalized.push(name);
    }
    normalized
}

pub fn validate_page(params: &PaginatedSearchParams) -> Result<PageRequest, AppError> {
    let mut errors = FieldErrors::new();
    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

    let size_ok = (1..=MAX_PAGE_SIZE).contains(&page_size);
    if page == 0 {
        errors.add("page", "Page must be at least 1.");
    } else if size_ok
        && !(page - 1)
            .checked_mul(page_size)
            .is_some_and(|offset| offset <= MAX_OFFSET)
    {
        errors.add("page", "Page is out of range.");
    }
    if !size_ok {
        errors.add(
            "pageSize",
            format!("Page size must be between 1 and {MAX_PAGE_SIZE}."),
        );
    }

    errors.into_result()?;
    Ok(PageRequest { page, page_size })
}

/// Trimmed search text, or `None` when there is nothing to match on.
pub fn search_query(params: &PaginatedSearchParams) -> Option<&str> {
    params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
}
