use crate::{
    cache::cache::{Cache, CacheKeyType, CacheLifetime},
    error::{Error, QueryError},
    payload::ValidTag,
    schema::{Id, Tag},
};

use sqlx::{Pool, Postgres};

pub async fn list_tags(cache: &Cache, pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    cache
        .get_or(CacheKeyType::Tags.new("all"), || fetch_tags(pool))
        .await
}

pub async fn fetch_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Tag, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    tag.ok_or_else(|| Error::NotFound("No tag exists with specified id".to_owned()))
}

/// Name, color and slug are each unique; any collision skips the insert.
pub async fn create_tag(tag: ValidTag, cache: &Cache, pool: &Pool<Postgres>) -> Result<Tag, Error> {
    let created: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(tag.name)
    .bind(tag.color)
    .bind(tag.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let created = created.ok_or_else(|| {
        Error::Conflict("A tag with this name, color or slug already exists".to_owned())
    })?;

    cache.invalidate(CacheLifetime::BindTagCache).await;

    Ok(created)
}
