//! SeaORM entities for the forum tables.

pub mod question;
pub mod tag;
pub mod tag_question;
pub mod user;

// Prelude module for easy importing of all entities
pub mod prelude {
    pub use super::question::Entity as Question;
    pub use super::tag::Entity as Tag;
    pub use super::tag_question::Entity as TagQuestion;
    pub use super::user::Entity as User;
}
