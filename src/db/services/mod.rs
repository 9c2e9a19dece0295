pub mod question_service;
pub mod tag_service;
pub mod user_service;

pub use question_service::{create_question, edit_question, get_question, list_questions};
pub use tag_service::{get_tag_questions, list_tags, TagDiff};
pub use user_service::{create_user, get_user};

use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{ColumnTrait, DatabaseTransaction};
use tracing::error;

use crate::error::AppError;

/// Commits on success and rolls back otherwise, so the transaction is always
/// released before the operation returns.
pub(crate) async fn finish<T>(
    txn: DatabaseTransaction,
    outcome: Result<T, AppError>,
) -> Result<T, AppError> {
    match outcome {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                error!(error = %rollback_err, "Failed to roll back transaction.");
            }
            Err(err)
        }
    }
}

/// Case-insensitive substring match: `lower(col) LIKE '%needle%'`.
///
/// Folding of non-ASCII letters follows the backend's `lower()`: Postgres folds
/// Unicode, SQLite folds ASCII only, so on SQLite an uppercase non-ASCII letter
/// stored in the column only matches itself.
pub(crate) fn contains_ci<C: ColumnTrait>(column: C, needle: &str) -> SimpleExpr {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Expr::expr(Func::lower(Expr::col(column)))
        .like(LikeExpr::new(format!("%{escaped}%")).escape('\\'))
}
