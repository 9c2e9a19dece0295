use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "questions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub author_id: i32,
    pub upvotes: i32,
    pub downvotes: i32,
    pub answers: i32,
    pub views: i32,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    Author,
    #[sea_orm(has_many = "super::tag_question::Entity")]
    TagQuestions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::tag_question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TagQuestions.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::tag_question::Relation::Tag.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::tag_question::Relation::Question.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
