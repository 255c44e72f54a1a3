use crate::{
    cache::cache::{Cache, CacheKeyType, CacheLifetime},
    error::{Error, QueryError},
    schema::{Id, Ingredient},
    seed::SeedIngredient,
    INGREDIENT_IMPORT_CHUNK,
};

use sqlx::{Pool, Postgres, QueryBuilder};

/// Catalog entries whose name starts with `name`, ignoring case. Results are
/// cached per lower-cased prefix.
pub async fn list_ingredients(
    name: Option<&str>,
    cache: &Cache,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let prefix = name.unwrap_or_default().trim().to_lowercase();
    let key = CacheKeyType::Ingredients.new(prefix.clone());

    cache
        .get_or(key, move || async move { fetch_ingredients(&prefix, pool).await })
        .await
}

pub async fn fetch_ingredients(prefix: &str, pool: &Pool<Postgres>) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = sqlx::query_as(
        "SELECT * FROM ingredients WHERE starts_with(lower(name), $1) ORDER BY name, measurement_unit",
    )
    .bind(prefix)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Ingredient, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    row.ok_or_else(|| Error::NotFound("No ingredient exists with specified id".to_owned()))
}

/// Inserts the catalog in chunks inside one transaction. Rows already present
/// (same name and unit) are skipped; returns how many were inserted.
pub async fn import_ingredients(
    rows: &[SeedIngredient],
    cache: &Cache,
    pool: &Pool<Postgres>,
) -> Result<u64, Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let mut inserted = 0;
    for chunk in rows.chunks(INGREDIENT_IMPORT_CHUNK) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");

        query_builder.push_values(chunk, |mut b, row| {
            b.push_bind(&row.name).push_bind(&row.measurement_unit);
        });
        query_builder.push(" ON CONFLICT DO NOTHING");

        let result = query_builder
            .build()
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?;
        inserted += result.rows_affected();
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    if inserted > 0 {
        cache.invalidate(CacheLifetime::BindIngredientCache).await;
    }
    log::info!("Imported {inserted} of {} ingredients", rows.len());

    Ok(inserted)
}
