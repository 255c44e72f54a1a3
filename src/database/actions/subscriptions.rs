use std::collections::HashMap;

use crate::{
    authentication::permissions::ActionType,
    error::{Error, QueryError, TypeError},
    form::Form,
    jwt::SessionData,
    pagination::{Page, PageRequest},
    schema::{Id, PublicUser, PublicUserRow, ShortRecipe, Subscribed},
};

use super::users::get_public_user;

use sqlx::{Pool, Postgres};

#[derive(sqlx::FromRow, Debug)]
struct AuthorRecipeRow {
    author_id: Id,
    #[sqlx(flatten)]
    recipe: ShortRecipe,
}

/// `?recipes_limit=` caps how many recipes each author carries; absent means all.
pub fn recipes_limit(form: &Form) -> Result<Option<i64>, TypeError> {
    match form.get_number::<i64>("recipes_limit")? {
        Some(limit) if limit < 0 => Err(TypeError::new(
            "recipes_limit",
            "Must be zero or a positive number",
        )),
        limit => Ok(limit),
    }
}

pub async fn subscribe(
    session: &SessionData,
    author_id: Id,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Subscribed, Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    if author_id == session.user_id {
        return Err(Error::field("author", "You cannot subscribe to yourself."));
    }

    let author = get_public_user(author_id, Some(session.user_id), pool).await?;

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(session.user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::Conflict(
            "You are already subscribed to this author".to_owned(),
        ));
    }

    let author = PublicUser {
        is_subscribed: true,
        ..author
    };
    let mut subscribed = with_recipes(vec![author], recipes_limit, pool).await?;

    subscribed
        .pop()
        .ok_or_else(|| Error::Fatal("Subscribed author vanished".to_owned()))
}

pub async fn unsubscribe(
    session: &SessionData,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    get_public_user(author_id, Some(session.user_id), pool).await?;

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(session.user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::NotLinked(
            "You are not subscribed to this author".to_owned(),
        ));
    }

    Ok(())
}

pub async fn list_subscriptions(
    session: &SessionData,
    request: &PageRequest,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Page<Subscribed>, Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let rows: Vec<PublicUserRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            TRUE AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(request.limit)
    .bind(request.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    request.check_in_range(rows.len())?;
    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let authors = rows.into_iter().map(|row| row.user).collect();
    let results = with_recipes(authors, recipes_limit, pool).await?;

    Ok(Page::from_rows(results, total_count, request))
}

/// Attaches each author's newest recipes (at most `recipes_limit`) and their
/// total recipe count.
async fn with_recipes(
    authors: Vec<PublicUser>,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Subscribed>, Error> {
    if authors.is_empty() {
        return Ok(vec![]);
    }
    let ids: Vec<Id> = authors.iter().map(|author| author.id).collect();

    let recipes: Vec<AuthorRecipeRow> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time FROM (
            SELECT r.author_id, r.id, r.name, r.image, r.cooking_time,
                ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.id DESC) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR position <= $2
        ORDER BY author_id, id DESC
    ",
    )
    .bind(&ids)
    .bind(recipes_limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let counts: Vec<(Id, i64)> = sqlx::query_as(
        "SELECT author_id, COUNT(*) FROM recipes WHERE author_id = ANY($1) GROUP BY author_id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let counts: HashMap<Id, i64> = counts.into_iter().collect();
    let mut by_author: HashMap<Id, Vec<ShortRecipe>> = HashMap::new();
    recipes.into_iter().for_each(|row| {
        by_author
            .entry(row.author_id)
            .or_default()
            .push(row.recipe.with_media_url())
    });

    Ok(authors
        .into_iter()
        .map(|user| Subscribed {
            recipes: by_author.remove(&user.id).unwrap_or_default(),
            recipes_count: counts.get(&user.id).copied().unwrap_or(0),
            user,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipes_limit_is_optional_and_non_negative() {
        assert_eq!(recipes_limit(&Form::from_query("")).unwrap(), None);
        assert_eq!(
            recipes_limit(&Form::from_query("recipes_limit=3")).unwrap(),
            Some(3)
        );
        assert!(recipes_limit(&Form::from_query("recipes_limit=-1")).is_err());
        assert!(recipes_limit(&Form::from_query("recipes_limit=x")).is_err());
    }
}
