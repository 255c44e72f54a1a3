use crate::{
    authentication::permissions::ActionType,
    error::{Error, QueryError},
    jwt::SessionData,
    schema::Id,
    shopping::aggregation::{CartIngredient, ShoppingList},
};

use sqlx::{Pool, Postgres};

/// Every ingredient line of every recipe in the user's cart, unaggregated.
pub async fn list_cart_ingredients(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartIngredient>, Error> {
    let rows: Vec<CartIngredient> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, ri.amount
        FROM shopping_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// The caller's shopping list. Anonymous callers are refused before the store
/// is touched; an empty cart gives an empty list.
pub async fn build_shopping_list(
    session: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, Error> {
    let session = session.ok_or_else(|| {
        Error::Unauthorized("Authentication credentials were not provided".to_owned())
    })?;
    session.authenticate(ActionType::ManageOwnLists)?;

    let rows = list_cart_ingredients(session.user_id, pool).await?;
    log::debug!(
        "Aggregating {} cart lines for user {}",
        rows.len(),
        session.user_id
    );

    Ok(ShoppingList::aggregate(rows))
}
