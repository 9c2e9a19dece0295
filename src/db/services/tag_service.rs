use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::warn;

use super::contains_ci;
use super::question_service::hydrate_questions;
use crate::db::entities::{prelude::*, question, tag, tag_question};
use crate::error::AppError;
use crate::models::{Page, PaginatedSearchParams, TagFilter, TagQuestions, TagRef, TagView};
use crate::validation::{search_query, validate_page};

// --- Tag Service Functions ---

/// Tag names a question edit has to add and remove. Names present on both
/// sides appear in neither list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl TagDiff {
    pub fn compute(current: &[String], requested: &[String]) -> Self {
        let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();
        let requested_set: HashSet<&str> = requested.iter().map(String::as_str).collect();

        Self {
            to_add: requested
                .iter()
                .filter(|name| !current_set.contains(name.as_str()))
                .cloned()
                .collect(),
            to_remove: current
                .iter()
                .filter(|name| !requested_set.contains(name.as_str()))
                .cloned()
                .collect(),
        }
    }
}

/// Find-or-create each tag and bump its counter, one atomic
/// `INSERT .. ON CONFLICT (name) DO UPDATE` statement per name.
/// Returns the tag rows in the order of `names`.
pub(crate) async fn upsert_tags<C: ConnectionTrait>(
    db: &C,
    names: &[String],
) -> Result<Vec<tag::Model>, DbErr> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    // Row locks are taken in name order so overlapping tag sets cannot deadlock.
    let mut lock_order: Vec<&String> = names.iter().collect();
    lock_order.sort();

    let now = Utc::now();
    for name in lock_order {
        let model = tag::ActiveModel {
            name: Set(name.clone()),
            question_count: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Tag::insert(model)
            .on_conflict(
                OnConflict::column(tag::Column::Name)
                    .value(
                        tag::Column::QuestionCount,
                        Expr::col((Tag, tag::Column::QuestionCount)).add(1),
                    )
                    .update_column(tag::Column::UpdatedAt)
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    let mut by_name: HashMap<String, tag::Model> = Tag::find()
        .filter(tag::Column::Name.is_in(names.iter().cloned()))
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.name.clone(), t))
        .collect();

    names
        .iter()
        .map(|name| {
            by_name
                .remove(name)
                .ok_or_else(|| DbErr::RecordNotFound(format!("Tag '{name}' missing after upsert")))
        })
        .collect()
}

/// Decrements the counters of `tag_ids` in one statement, never below zero.
/// Tag rows are kept even when their counter reaches zero.
pub(crate) async fn decrement_tags<C: ConnectionTrait>(db: &C, tag_ids: &[i32]) -> Result<(), DbErr> {
    if tag_ids.is_empty() {
        return Ok(());
    }

    let result = Tag::update_many()
        .col_expr(
            tag::Column::QuestionCount,
            Expr::col(tag::Column::QuestionCount).sub(1),
        )
        .col_expr(tag::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(tag::Column::Id.is_in(tag_ids.iter().copied()))
        .filter(tag::Column::QuestionCount.gt(0))
        .exec(db)
        .await?;

    if (result.rows_affected as usize) < tag_ids.len() {
        warn!(
            tag_ids = ?tag_ids,
            decremented = result.rows_affected,
            "Tag counters were already at zero; clamped instead of going negative."
        );
    }
    Ok(())
}

/// Inserts one association row per tag for the question.
pub(crate) async fn link_tags<C: ConnectionTrait>(
    db: &C,
    question_id: i32,
    tag_ids: &[i32],
) -> Result<(), DbErr> {
    if tag_ids.is_empty() {
        return Ok(());
    }

    let now = Utc::now();
    let rows = tag_ids.iter().map(|&tag_id| tag_question::ActiveModel {
        tag_id: Set(tag_id),
        question_id: Set(question_id),
        created_at: Set(now),
    });
    TagQuestion::insert_many(rows)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Removes the question's association rows for `tag_ids`; rows of other questions are untouched.
pub(crate) async fn unlink_tags<C: ConnectionTrait>(
    db: &C,
    question_id: i32,
    tag_ids: &[i32],
) -> Result<u64, DbErr> {
    if tag_ids.is_empty() {
        return Ok(0);
    }

    let result = TagQuestion::delete_many()
        .filter(tag_question::Column::QuestionId.eq(question_id))
        .filter(tag_question::Column::TagId.is_in(tag_ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Batch-fetches the tags of several questions, keyed by question id.
pub(crate) async fn tags_for_questions<C: ConnectionTrait>(
    db: &C,
    question_ids: &[i32],
) -> Result<HashMap<i32, Vec<TagRef>>, DbErr> {
    let rows = TagQuestion::find()
        .filter(tag_question::Column::QuestionId.is_in(question_ids.iter().copied()))
        .find_also_related(Tag)
        .all(db)
        .await?;

    let mut tag_map: HashMap<i32, Vec<TagRef>> = HashMap::new();
    for (link, tag) in rows {
        if let Some(tag) = tag {
            tag_map
                .entry(link.question_id)
                .or_default()
                .push(TagRef::from(&tag));
        }
    }
    Ok(tag_map)
}

/// Lists tags with optional name search, sorted by the requested filter.
pub async fn list_tags(
    db: &DatabaseConnection,
    params: PaginatedSearchParams,
) -> Result<Page<TagView>, AppError> {
    let page = validate_page(&params)?;

    let mut query = Tag::find();
    if let Some(text) = search_query(&params) {
        query = query.filter(contains_ci(tag::Column::Name, text));
    }
    query = match TagFilter::parse(params.filter.as_deref()) {
        TagFilter::Popular => query
            .order_by_desc(tag::Column::QuestionCount)
            .order_by_asc(tag::Column::Name),
        TagFilter::Recent => query
            .order_by_desc(tag::Column::CreatedAt)
            .order_by_desc(tag::Column::Id),
        TagFilter::Oldest => query
            .order_by_asc(tag::Column::CreatedAt)
            .order_by_asc(tag::Column::Id),
        TagFilter::Name => query.order_by_asc(tag::Column::Name),
    };

    let total = query.clone().count(db).await?;
    let tags = query
        .offset(page.offset())
        .limit(page.page_size)
        .all(db)
        .await?;
    let has_next = page.has_next(total, tags.len());

    Ok(Page {
        items: tags.into_iter().map(TagView::from).collect(),
        has_next,
    })
}

/// Questions that reference a tag, newest first, with an optional title search.
pub async fn get_tag_questions(
    db: &DatabaseConnection,
    tag_id: i32,
    params: PaginatedSearchParams,
) -> Result<TagQuestions, AppError> {
    let page = validate_page(&params)?;

    let tag = Tag::find_by_id(tag_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tag {tag_id} not found")))?;

    let mut query = Question::find().filter(
        question::Column::Id.in_subquery(
            Query::select()
                .column(tag_question::Column::QuestionId)
                .from(TagQuestion)
                .and_where(tag_question::Column::TagId.eq(tag_id))
                .to_owned(),
        ),
    );
    if let Some(text) = search_query(&params) {
        query = query.filter(contains_ci(question::Column::Title, text));
    }
    query = query
        .order_by_desc(question::Column::CreatedAt)
        .order_by_desc(question::Column::Id);

    let total = query.clone().count(db).await?;
    let questions = query
        .offset(page.offset())
        .limit(page.page_size)
        .all(db)
        .await?;
    let has_next = page.has_next(total, questions.len());

    Ok(TagQuestions {
        tag: tag.into(),
        questions: hydrate_questions(db, questions).await?,
        has_next,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuestionLimits;
    use crate::db::services::question_service::create_question;
    use crate::db::test_support::{ask, seed_user, setup_db, tag_by_name};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_keeps_shared_tags_out() {
        let diff = TagDiff::compute(&names(&["css", "flexbox"]), &names(&["css", "grid"]));
        assert_eq!(diff.to_add, names(&["grid"]));
        assert_eq!(diff.to_remove, names(&["flexbox"]));
    }

    #[test]
    fn test_diff_of_same_set_is_empty() {
        let diff = TagDiff::compute(&names(&["a", "b"]), &names(&["b", "a"]));
        assert_eq!(diff, TagDiff::default());
    }

    #[test]
    fn test_diff_grow_and_shrink() {
        let grow = TagDiff::compute(&names(&["a"]), &names(&["a", "b", "c"]));
        assert_eq!(grow.to_add, names(&["b", "c"]));
        assert!(grow.to_remove.is_empty());

        let shrink = TagDiff::compute(&names(&["a", "b", "c"]), &names(&["c"]));
        assert!(shrink.to_add.is_empty());
        assert_eq!(shrink.to_remove, names(&["a", "b"]));
    }

    #[tokio::test]
    async fn test_upsert_creates_then_increments() {
        let db = setup_db().await;

        let first = upsert_tags(&db, &names(&["rust", "tokio"])).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].name, "rust");
        assert_eq!(first[0].question_count, 1);

        let second = upsert_tags(&db, &names(&["tokio", "rust"])).await.unwrap();
        assert_eq!(second[0].name, "tokio");
        assert_eq!(second[0].question_count, 2);
        assert_eq!(second[1].id, first[0].id);
        assert_eq!(Tag::find().count(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_decrement_clamps_at_zero() {
        let db = setup_db().await;
        let tags = upsert_tags(&db, &names(&["solo"])).await.unwrap();
        let ids = vec![tags[0].id];

        decrement_tags(&db, &ids).await.unwrap();
        decrement_tags(&db, &ids).await.unwrap();

        let tag = tag_by_name(&db, "solo").await.unwrap();
        assert_eq!(tag.question_count, 0);
    }

    #[tokio::test]
    async fn test_list_tags_sorting_and_search() {
        let db = setup_db().await;
        let (_, session) = seed_user(&db, "ada").await;
        let limits = QuestionLimits::default();

        create_question(&db, &limits, Some(&session), ask("First question", &["rust", "async"]))
            .await
            .unwrap();
        create_question(&db, &limits, Some(&session), ask("Second question", &["rust"]))
            .await
            .unwrap();
        create_question(&db, &limits, Some(&session), ask("Third question", &["zig"]))
            .await
            .unwrap();

        let popular = list_tags(&db, PaginatedSearchParams::default()).await.unwrap();
        let popular_names: Vec<&str> = popular.items.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(popular_names, vec!["rust", "async", "zig"]);
        assert_eq!(popular.items[0].question_count, 2);
        assert!(!popular.has_next);

        let by_name = list_tags(
            &db,
            PaginatedSearchParams {
                filter: Some("name".to_string()),
                page_size: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let by_name_names: Vec<&str> = by_name.items.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(by_name_names, vec!["async", "rust"]);
        assert!(by_name.has_next);

        let searched = list_tags(
            &db,
            PaginatedSearchParams {
                query: Some("RU".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(searched.items.len(), 1);
        assert_eq!(searched.items[0].name, "rust");
    }

    #[tokio::test]
    async fn test_get_tag_questions() {
        let db = setup_db().await;
        let (_, session) = seed_user(&db, "ada").await;
        let limits = QuestionLimits::default();

        let first = create_question(&db, &limits, Some(&session), ask("Borrow checker woes", &["rust"]))
            .await
            .unwrap();
        let second = create_question(&db, &limits, Some(&session), ask("Pinning futures", &["rust", "async"]))
            .await
            .unwrap();
        create_question(&db, &limits, Some(&session), ask("Unrelated question", &["zig"]))
            .await
            .unwrap();

        let rust = tag_by_name(&db, "rust").await.unwrap();
        let result = get_tag_questions(&db, rust.id, PaginatedSearchParams::default())
            .await
            .unwrap();
        assert_eq!(result.tag.name, "rust");
        let ids: Vec<i32> = result.questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(result.questions[0].tag_names(), vec!["async", "rust"]);

        let filtered = get_tag_questions(
            &db,
            rust.id,
            PaginatedSearchParams {
                query: Some("borrow".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(filtered.questions.len(), 1);
        assert_eq!(filtered.questions[0].id, first.id);

        let missing = get_tag_questions(&db, 9999, PaginatedSearchParams::default()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
