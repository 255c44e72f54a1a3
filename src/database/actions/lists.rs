use crate::{
    authentication::permissions::ActionType,
    error::{Error, QueryError},
    jwt::SessionData,
    schema::{Id, ListKind, ShortRecipe},
};

use super::recipes::get_short_recipe;

use sqlx::{Pool, Postgres};

/// Puts a recipe on one of the caller's lists. The unique pair constraint
/// decides duplicates: a skipped insert is a conflict.
pub async fn add_to_list(
    kind: ListKind,
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<ShortRecipe, Error> {
    session.authenticate(ActionType::ManageOwnLists)?;
    let recipe = get_short_recipe(recipe_id, pool).await?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.table()
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::Conflict(kind.already_listed().to_owned()));
    }

    Ok(recipe)
}

pub async fn remove_from_list(
    kind: ListKind,
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnLists)?;
    get_short_recipe(recipe_id, pool).await?;

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::NotLinked(kind.not_listed().to_owned()));
    }

    Ok(())
}
