//! Question mutations and reads.
//!
//! A question, the counters of the tags it references and its association
//! rows change together inside one transaction or not at all.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use futures::try_join;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info};

use super::tag_service::{self, TagDiff};
use super::{contains_ci, finish};
use crate::auth::{require_session, Session};
use crate::config::QuestionLimits;
use crate::db::entities::{prelude::*, question, user};
use crate::error::AppError;
use crate::models::{
    AuthorRef, CreateQuestionParams, EditQuestionParams, Page, PaginatedSearchParams,
    QuestionFilter, QuestionInput, QuestionView, TagRef,
};
use crate::validation::{search_query, validate_page, validate_question};

pub async fn create_question(
    db: &DatabaseConnection,
    limits: &QuestionLimits,
    session: Option<&Session>,
    params: CreateQuestionParams,
) -> Result<QuestionView, AppError> {
    let input = validate_question(&params.title, &params.content, &params.tags, limits)?;
    let session = require_session(session)?;

    let author = User::find_by_id(session.user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Unauthorized(format!("Unknown user {}", session.user_id)))?;

    // The first statement inside the transaction is a write, so concurrent
    // creators queue on the store's write lock instead of failing an upgrade.
    let txn = db.begin().await?;
    let outcome = insert_question_with_tags(&txn, &author, input).await;
    let view = finish(txn, outcome).await?;

    info!(
        question_id = view.id,
        author_id = view.author.id,
        tags = ?view.tag_names(),
        "Question created."
    );
    Ok(view)
}

async fn insert_question_with_tags(
    txn: &DatabaseTransaction,
    author: &user::Model,
    input: QuestionInput,
) -> Result<QuestionView, AppError> {
    let tags = tag_service::upsert_tags(txn, &input.tags).await?;
    let tag_ids: Vec<i32> = tags.iter().map(|t| t.id).collect();

    let now = Utc::now();
    let question = question::ActiveModel {
        title: Set(input.title),
        content: Set(input.content),
        author_id: Set(author.id),
        upvotes: Set(0),
        downvotes: Set(0),
        answers: Set(0),
        views: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    tag_service::link_tags(txn, question.id, &tag_ids).await?;

    Ok(QuestionView::assemble(
        question,
        tags.iter().map(TagRef::from).collect(),
        AuthorRef::from(author),
    ))
}

pub async fn edit_question(
    db: &DatabaseConnection,
    limits: &QuestionLimits,
    session: Option<&Session>,
    params: EditQuestionParams,
) -> Result<QuestionView, AppError> {
    let input = validate_question(&params.title, &params.content, &params.tags, limits)?;
    let session = require_session(session)?;
    let question_id = params.question_id;

    let txn = db.begin().await?;
    let outcome = apply_edit(&txn, session.user_id, question_id, input).await;
    let diff = finish(txn, outcome).await?;

    info!(
        question_id,
        added = ?diff.to_add,
        removed = ?diff.to_remove,
        "Question updated."
    );
    get_question(db, question_id).await
}

async fn apply_edit(
    txn: &DatabaseTransaction,
    user_id: i32,
    question_id: i32,
    input: QuestionInput,
) -> Result<TagDiff, AppError> {
    // Row lock serializes concurrent edits of the same question.
    let question = Question::find_by_id(question_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Question {question_id} not found")))?;

    if question.author_id != user_id {
        return Err(AppError::Unauthorized(
            "Only the author can edit this question.".to_string(),
        ));
    }

    let current_tags = question.find_related(Tag).all(txn).await?;
    let current_names: Vec<String> = current_tags.iter().map(|t| t.name.clone()).collect();
    let diff = TagDiff::compute(&current_names, &input.tags);
    debug!(question_id, to_add = ?diff.to_add, to_remove = ?diff.to_remove, "Computed tag diff.");

    let added = tag_service::upsert_tags(txn, &diff.to_add).await?;
    let added_ids: Vec<i32> = added.iter().map(|t| t.id).collect();

    Question::update_many()
        .col_expr(question::Column::Title, Expr::value(input.title))
        .col_expr(question::Column::Content, Expr::value(input.content))
        .col_expr(question::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(question::Column::Id.eq(question_id))
        .exec(txn)
        .await?;

    let removed_ids: Vec<i32> = current_tags
        .iter()
        .filter(|t| diff.to_remove.contains(&t.name))
        .map(|t| t.id)
        .collect();
    tag_service::decrement_tags(txn, &removed_ids).await?;

    tag_service::link_tags(txn, question_id, &added_ids).await?;
    tag_service::unlink_tags(txn, question_id, &removed_ids).await?;

    Ok(diff)
}

pub async fn get_question(db: &DatabaseConnection, question_id: i32) -> Result<QuestionView, AppError> {
    let question = Question::find_by_id(question_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Question {question_id} not found")))?;

    hydrate_questions(db, vec![question])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(format!("Question {question_id} vanished during load")))
}

pub async fn list_questions(
    db: &DatabaseConnection,
    params: PaginatedSearchParams,
) -> Result<Page<QuestionView>, AppError> {
    let page = validate_page(&params)?;

    let mut query = Question::find();
    if let Some(text) = search_query(&params) {
        query = query.filter(
            Condition::any()
                .add(contains_ci(question::Column::Title, text))
                .add(contains_ci(question::Column::Content, text)),
        );
    }
    query = match QuestionFilter::parse(params.filter.as_deref()) {
        QuestionFilter::Newest => query,
        QuestionFilter::Unanswered => query.filter(question::Column::Answers.eq(0)),
        QuestionFilter::Popular => query.order_by_desc(question::Column::Upvotes),
    }
    .order_by_desc(question::Column::CreatedAt)
    .order_by_desc(question::Column::Id);

    let total = query.clone().count(db).await?;
    let questions = query
        .offset(page.offset())
        .limit(page.page_size)
        .all(db)
        .await?;
    let has_next = page.has_next(total, questions.len());

    Ok(Page {
        items: hydrate_questions(db, questions).await?,
        has_next,
    })
}

/// Resolves tags and authors for a batch of questions with one query each,
/// preserving the input order.
pub(crate) async fn hydrate_questions<C: ConnectionTrait>(
    db: &C,
    questions: Vec<question::Model>,
) -> Result<Vec<QuestionView>, AppError> {
    if questions.is_empty() {
        return Ok(Vec::new());
    }

    let question_ids: Vec<i32> = questions.iter().map(|q| q.id).collect();
    let author_ids: HashSet<i32> = questions.iter().map(|q| q.author_id).collect();

    let tags_future = tag_service::tags_for_questions(db, &question_ids);
    let authors_future = User::find()
        .filter(user::Column::Id.is_in(author_ids))
        .all(db);
    let (mut tag_map, authors) = try_join!(tags_future, authors_future)?;

    let authors: HashMap<i32, user::Model> = authors.into_iter().map(|u| (u.id, u)).collect();

    questions
        .into_iter()
        .map(|question| {
            let author = authors.get(&question.author_id).map(AuthorRef::from).ok_or_else(|| {
                AppError::Internal(format!(
                    "Author {} of question {} not found",
                    question.author_id, question.id
                ))
            })?;
            let tags = tag_map.remove(&question.id).unwrap_or_default();
            Ok(QuestionView::assemble(question, tags, author))
        })
        .collect()
}
