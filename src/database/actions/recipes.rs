use std::collections::{HashMap, HashSet};

use crate::{
    authentication::permissions::{authorize_owner, ActionType},
    cache::cache::{Cache, CacheKeyType, CacheLifetime},
    error::{Error, QueryError, TypeError},
    form::Form,
    jwt::SessionData,
    pagination::{Page, PageRequest},
    payload::{ValidRecipe, Validator},
    schema::{
        Id, Recipe, RecipeComposition, RecipeDetail, RecipeIngredient, RecipeRow, RecipeSummary,
        RecipeTagRow, ShortRecipe, Tag,
    },
};

use super::users::get_public_user;

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

/// Listing filters from `?author=&tags=&is_favorited=&is_in_shopping_cart=`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    /// Tag slugs; a recipe matches when it carries any of them.
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeFilter {
    pub fn from_form(form: &Form) -> Result<Self, TypeError> {
        Ok(Self {
            author: form.get_number::<Id>("author")?,
            tags: form.get_all("tags"),
            is_favorited: form.get_flag("is_favorited"),
            is_in_shopping_cart: form.get_flag("is_in_shopping_cart"),
        })
    }
}

/// Newest recipes first. The list flags only narrow the result for a known
/// viewer; anonymous callers get them ignored.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    request: &PageRequest,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Page<RecipeSummary>, Error> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "
        SELECT r.id, r.name, r.image, r.cooking_time, r.author_id,
            u.first_name AS author_first_name, u.last_name AS author_last_name,
            EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
    );
    query_builder.push_bind(viewer);
    query_builder.push(
        ") AS is_favorited,
            EXISTS(SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
    );
    query_builder.push_bind(viewer);
    query_builder.push(
        ") AS is_in_shopping_cart,
            COUNT(*) OVER() AS count
        FROM recipes r
        INNER JOIN users u ON u.id = r.author_id
        WHERE TRUE",
    );

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ");
        query_builder.push_bind(author);
    }
    if !filter.tags.is_empty() {
        query_builder.push(
            " AND EXISTS(SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        );
        query_builder.push_bind(filter.tags.clone());
        query_builder.push("))");
    }
    if let Some(viewer) = viewer {
        if filter.is_favorited {
            query_builder.push(
                " AND EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
            );
            query_builder.push_bind(viewer);
            query_builder.push(")");
        }
        if filter.is_in_shopping_cart {
            query_builder.push(
                " AND EXISTS(SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
            );
            query_builder.push_bind(viewer);
            query_builder.push(")");
        }
    }

    query_builder.push(" ORDER BY r.id DESC LIMIT ");
    query_builder.push_bind(request.limit);
    query_builder.push(" OFFSET ");
    query_builder.push_bind(request.offset());

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    request.check_in_range(rows.len())?;
    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let ids: Vec<Id> = rows.iter().map(|row| row.id).collect();
    let mut tags = list_tags_for_recipes(&ids, pool).await?;

    let summaries = rows
        .into_iter()
        .map(|row| {
            let recipe_tags = tags.remove(&row.id).unwrap_or_default();
            RecipeSummary::from_row(row, recipe_tags)
        })
        .collect();

    Ok(Page::from_rows(summaries, total_count, request))
}

async fn list_tags_for_recipes(
    ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, Vec<Tag>>, Error> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<RecipeTagRow> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut hashmap: HashMap<Id, Vec<Tag>> = HashMap::new();
    rows.into_iter()
        .for_each(|row| hashmap.entry(row.recipe_id).or_default().push(row.tag));

    Ok(hashmap)
}

pub async fn get_recipe(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as(
        "
        SELECT r.*,
            EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = $2) AS is_favorited,
            EXISTS(SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = $2) AS is_in_shopping_cart
        FROM recipes r
        WHERE r.id = $1
    ",
    )
    .bind(id)
    .bind(viewer)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_short_recipe(id: Id, pool: &Pool<Postgres>) -> Result<ShortRecipe, Error> {
    let row: Option<ShortRecipe> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    row.map(ShortRecipe::with_media_url)
        .ok_or_else(recipe_not_found)
}

pub async fn load_recipe_composition(
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipeComposition, Error> {
    let tags: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.* FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
    ",
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let ingredients: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY i.name, i.measurement_unit
    ",
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(RecipeComposition { tags, ingredients })
}

pub async fn get_recipe_detail(
    id: Id,
    viewer: Option<Id>,
    cache: &Cache,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, Error> {
    let recipe = get_recipe(id, viewer, pool)
        .await?
        .ok_or_else(recipe_not_found)?;
    let author = get_public_user(recipe.author_id, viewer, pool).await?;
    let composition = cache
        .get_or(CacheKeyType::Recipe.new(id), || load_recipe_composition(id, pool))
        .await?;

    Ok(RecipeDetail::assemble(recipe, author, composition))
}

/// Fetches a recipe the session may modify.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let recipe = get_recipe(id, Some(session.user_id), pool)
        .await?
        .ok_or_else(recipe_not_found)?;

    authorize_owner(session, recipe.author_id)?;

    Ok(recipe)
}

/// Every referenced ingredient and tag must exist; missing ones are reported
/// per field.
pub async fn check_references(recipe: &ValidRecipe, pool: &Pool<Postgres>) -> Result<(), Error> {
    let ingredient_ids: Vec<Id> = recipe.ingredients.iter().map(|(id, _)| *id).collect();

    let found_ingredients: Vec<(Id,)> =
        sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
            .bind(&ingredient_ids)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;
    let found_tags: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(&recipe.tags)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let mut v = Validator::default();
    missing_ids(&ingredient_ids, &found_ingredients)
        .for_each(|id| v.error("ingredients", format!("Ingredient {id} does not exist.")));
    missing_ids(&recipe.tags, &found_tags)
        .for_each(|id| v.error("tags", format!("Tag {id} does not exist.")));

    v.finish()
}

fn missing_ids<'a>(wanted: &'a [Id], found: &[(Id,)]) -> impl Iterator<Item = Id> + 'a {
    let found: HashSet<Id> = found.iter().map(|row| row.0).collect();
    wanted.iter().copied().filter(move |id| !found.contains(id))
}

pub async fn create_recipe(
    author_id: Id,
    recipe: &ValidRecipe,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<Id, Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(image)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    insert_recipe_parts(id.0, recipe, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("User {author_id} created recipe {}", id.0);
    Ok(id.0)
}

/// Replaces the recipe's fields, tags and ingredients. `image` keeps the
/// current picture when `None`.
pub async fn update_recipe(
    id: Id,
    recipe: &ValidRecipe,
    image: Option<&str>,
    cache: &Cache,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query(
        "
        UPDATE recipes
        SET name = $2, text = $3, cooking_time = $4, image = COALESCE($5, image)
        WHERE id = $1
    ",
    )
    .bind(id)
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(image)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    insert_recipe_parts(id, recipe, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    cache.invalidate(CacheLifetime::BindRecipeCache).await;
    Ok(())
}

async fn insert_recipe_parts(
    id: Id,
    recipe: &ValidRecipe,
    conn: &mut PgConnection,
) -> Result<(), Error> {
    if !recipe.tags.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        query_builder.push_values(recipe.tags.iter(), |mut b, tag_id| {
            b.push_bind(id).push_bind(*tag_id);
        });
        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    if !recipe.ingredients.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
        query_builder.push_values(recipe.ingredients.iter(), |mut b, (ingredient_id, amount)| {
            b.push_bind(id).push_bind(*ingredient_id).push_bind(*amount);
        });
        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}

/// Deletes a recipe; favorites, cart entries and parts go with it.
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF
pub async fn delete_recipe(id: Id, cache: &Cache, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(recipe_not_found());
    }

    cache.invalidate(CacheLifetime::BindRecipeCache).await;
    Ok(())
}

fn recipe_not_found() -> Error {
    Error::NotFound("No recipe exists with specified id".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_read_repeated_tags_and_flags() {
        let form = Form::from_query("author=3&tags=lunch&tags=dinner&is_favorited=1");
        let filter = RecipeFilter::from_form(&form).unwrap();

        assert_eq!(
            filter,
            RecipeFilter {
                author: Some(3),
                tags: vec!["lunch".into(), "dinner".into()],
                is_favorited: true,
                is_in_shopping_cart: false,
            }
        );
    }

    #[test]
    fn malformed_author_is_a_field_error() {
        let form = Form::from_query("author=abc");
        assert!(RecipeFilter::from_form(&form).is_err());
    }

    #[test]
    fn missing_ids_keep_request_order() {
        let missing: Vec<Id> = missing_ids(&[5, 1, 9, 2], &[(1,), (2,)]).collect();
        assert_eq!(missing, vec![5, 9]);
    }
}
