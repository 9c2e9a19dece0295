use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    // Upsert key. Names arrive already trimmed and lowercased.
    #[sea_orm(unique)]
    pub name: String,
    pub question_count: i32,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tag_question::Entity")]
    TagQuestions,
}

impl Related<super::tag_question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TagQuestions.def()
    }
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        super::tag_question::Relation::Question.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::tag_question::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
