use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::info;

use crate::db::entities::{prelude::*, user};
use crate::error::{AppError, FieldErrors};

// --- User Service Functions ---

/// Creates a new author. Usernames are unique.
pub async fn create_user(
    db: &DatabaseConnection,
    name: &str,
    username: &str,
    image: Option<&str>,
) -> Result<user::Model, AppError> {
    let name = name.trim();
    let username = username.trim().to_lowercase();

    let mut errors = FieldErrors::new();
    if name.is_empty() {
        errors.add("name", "Name is required.");
    }
    if username.is_empty() {
        errors.add("username", "Username is required.");
    } else if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        errors.add(
            "username",
            "Username can only contain letters, numbers, underscores and hyphens.",
        );
    }
    errors.into_result()?;

    let existing = User::find()
        .filter(user::Column::Username.eq(username.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Validation(FieldErrors::single(
            "username",
            "Username is already taken.",
        )));
    }

    let user = user::ActiveModel {
        name: Set(name.to_string()),
        username: Set(username),
        image: Set(image.map(str::to_string)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(user_id = user.id, username = %user.username, "User created.");
    Ok(user)
}

pub async fn get_user(db: &DatabaseConnection, user_id: i32) -> Result<user::Model, AppError> {
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))
}
