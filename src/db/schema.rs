//! Table bootstrap derived from the entity definitions.

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};
use tracing::info;

use crate::db::entities::{prelude::*, tag_question};

/// Creates the forum tables when missing. Referenced tables come first.
pub async fn ensure_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    create_table(db, User).await?;
    create_table(db, Tag).await?;
    create_table(db, Question).await?;
    create_table(db, TagQuestion).await?;

    let backend = db.get_database_backend();
    let index = Index::create()
        .name("idx_tag_questions_question_id")
        .table(TagQuestion)
        .col(tag_question::Column::QuestionId)
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&index)).await?;

    info!("Database schema is up to date.");
    Ok(())
}

async fn create_table<C, E>(db: &C, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}
