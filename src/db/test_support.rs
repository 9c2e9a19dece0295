//! Shared fixtures for database-backed tests: a single-connection in-memory SQLite store.

use sea_orm::{
    ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

use crate::auth::Session;
use crate::db::entities::{prelude::*, question, tag, tag_question, user};
use crate::db::schema::ensure_schema;
use crate::db::services::create_user;
use crate::models::CreateQuestionParams;

pub(crate) async fn setup_db() -> DatabaseConnection {
    // One connection: every pooled connection would otherwise get its own empty memory database.
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("open in-memory sqlite");
    ensure_schema(&db).await.expect("create schema");
    db
}

/// A file-backed store with a real pool, for tests where transactions must overlap.
/// Keep the returned directory alive for as long as the connection is used.
pub(crate) async fn setup_pooled_db(connections: u32) -> (tempfile::TempDir, DatabaseConnection) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("forum.db").display());
    let mut opt = ConnectOptions::new(url);
    opt.max_connections(connections)
        .min_connections(connections)
        .sqlx_logging(false);
    let db = Database::connect(opt).await.expect("open file sqlite");
    ensure_schema(&db).await.expect("create schema");
    (dir, db)
}

pub(crate) async fn seed_user(db: &DatabaseConnection, username: &str) -> (user::Model, Session) {
    let user = create_user(db, &format!("User {username}"), username, None)
        .await
        .expect("seed user");
    let session = Session {
        user_id: user.id,
        username: user.username.clone(),
    };
    (user, session)
}

pub(crate) fn ask(title: &str, tags: &[&str]) -> CreateQuestionParams {
    CreateQuestionParams {
        title: title.to_string(),
        content: format!("Details: {title}"),
        tags: tags.iter().map(|s| s.to_string()).collect(),
    }
}

pub(crate) async fn tag_by_name(db: &DatabaseConnection, name: &str) -> Option<tag::Model> {
    Tag::find()
        .filter(tag::Column::Name.eq(name))
        .one(db)
        .await
        .expect("query tag")
}

pub(crate) async fn links_for(db: &DatabaseConnection, question_id: i32) -> Vec<tag_question::Model> {
    TagQuestion::find()
        .filter(tag_question::Column::QuestionId.eq(question_id))
        .order_by_asc(tag_question::Column::TagId)
        .all(db)
        .await
        .expect("query links")
}

/// Every question, tag and association row, in a stable order.
pub(crate) async fn snapshot(
    db: &DatabaseConnection,
) -> (Vec<question::Model>, Vec<tag::Model>, Vec<tag_question::Model>) {
    let questions = Question::find()
        .order_by_asc(question::Column::Id)
        .all(db)
        .await
        .expect("query questions");
    let tags = Tag::find()
        .order_by_asc(tag::Column::Id)
        .all(db)
        .await
        .expect("query tags");
    let links = TagQuestion::find()
        .order_by_asc(tag_question::Column::QuestionId)
        .order_by_asc(tag_question::Column::TagId)
        .all(db)
        .await
        .expect("query links");
    (questions, tags, links)
}
