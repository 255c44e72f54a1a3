use sqlx::PgPool;
use warp::http::StatusCode;

use recipe_share::{
    actions::{add_to_list, build_shopping_list, list_cart_ingredients, remove_from_list},
    error::Error,
    jwt::SessionData,
    schema::{Id, ListKind, UserRole},
};

async fn user(pool: &PgPool, username: &str) -> SessionData {
    let user_id: Id = sqlx::query_scalar(
        "INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, 'Test', 'User', 'unused') RETURNING id",
    )
    .bind(format!("{username}@example.com"))
    .bind(username)
    .fetch_one(pool)
    .await
    .unwrap();

    SessionData {
        user_id,
        username: username.to_owned(),
        role: UserRole::User,
        is_admin: false,
    }
}

async fn ingredient(pool: &PgPool, name: &str, unit: &str) -> Id {
    sqlx::query_scalar(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(unit)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn recipe(pool: &PgPool, author: &SessionData, name: &str, parts: &[(Id, i32)]) -> Id {
    let id: Id = sqlx::query_scalar(
        "INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, 'Mix.', 'recipes/images/x.png', 10) RETURNING id",
    )
    .bind(author.user_id)
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap();

    for (ingredient_id, amount) in parts {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES ($1, $2, $3)",
        )
        .bind(id)
        .bind(ingredient_id)
        .bind(amount)
        .execute(pool)
        .await
        .unwrap();
    }

    id
}

#[sqlx::test(migrations = "./migrations")]
async fn adding_twice_conflicts_and_counts_once(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let bread = recipe(&pool, &cook, "Bread", &[(flour, 200)]).await;

    add_to_list(ListKind::ShoppingCart, &cook, bread, &pool)
        .await
        .unwrap();
    let error = add_to_list(ListKind::ShoppingCart, &cook, bread, &pool)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Conflict(_)));
    assert_eq!(error.status(), StatusCode::BAD_REQUEST);

    let list = build_shopping_list(Some(&cook), &pool).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list.items()[0].total_amount, 200);
}

#[sqlx::test(migrations = "./migrations")]
async fn removing_an_unlisted_recipe_is_not_linked(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let bread = recipe(&pool, &cook, "Bread", &[]).await;

    let error = remove_from_list(ListKind::ShoppingCart, &cook, bread, &pool)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::NotLinked(_)));

    let error = remove_from_list(ListKind::ShoppingCart, &cook, bread + 1000, &pool)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn shared_ingredients_are_summed_across_recipes(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let other = user(&pool, "other").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let milk = ingredient(&pool, "milk", "ml").await;

    let bread = recipe(&pool, &cook, "Bread", &[(flour, 200)]).await;
    let pancakes = recipe(&pool, &cook, "Pancakes", &[(flour, 150), (milk, 300)]).await;

    add_to_list(ListKind::ShoppingCart, &cook, bread, &pool)
        .await
        .unwrap();
    add_to_list(ListKind::ShoppingCart, &cook, pancakes, &pool)
        .await
        .unwrap();
    add_to_list(ListKind::ShoppingCart, &other, bread, &pool)
        .await
        .unwrap();
    add_to_list(ListKind::Favorite, &cook, pancakes, &pool)
        .await
        .unwrap();

    assert_eq!(list_cart_ingredients(cook.user_id, &pool).await.unwrap().len(), 3);

    let list = build_shopping_list(Some(&cook), &pool).await.unwrap();
    assert_eq!(
        list.render(),
        "Shopping list:\n01. Flour - 350 g\n02. Milk - 300 ml\n"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn empty_cart_gives_header_only(pool: PgPool) {
    let cook = user(&pool, "cook").await;

    let list = build_shopping_list(Some(&cook), &pool).await.unwrap();
    assert!(list.is_empty());
    assert_eq!(list.render(), "Shopping list:\n");
}
