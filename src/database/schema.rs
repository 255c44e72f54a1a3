use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::MEDIA_URL_PREFIX;

pub type Id = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: UserRole,
}

/// A user as seen by someone else; `is_subscribed` is relative to the viewer.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct PublicUserRow {
    #[sqlx(flatten)]
    pub user: PublicUser,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Subscribed {
    #[serde(flatten)]
    pub user: PublicUser,
    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeTagRow {
    pub recipe_id: Id,
    #[sqlx(flatten)]
    pub tag: Tag,
}

/// One ingredient line of a recipe, joined with the catalog entry.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeIngredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Recipe {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,

    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,

    pub author_id: Id,
    pub author_first_name: String,
    pub author_last_name: String,

    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,

    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortUser {
    pub id: Id,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeSummary {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: ShortUser,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeSummary {
    pub fn from_row(row: RecipeRow, tags: Vec<Tag>) -> Self {
        Self {
            id: row.id,
            tags,
            author: ShortUser {
                id: row.author_id,
                first_name: row.author_first_name,
                last_name: row.author_last_name,
            },
            name: row.name,
            image: media_url(&row.image),
            cooking_time: row.cooking_time,
            is_favorited: row.is_favorited,
            is_in_shopping_cart: row.is_in_shopping_cart,
        }
    }
}

/// Viewer-independent parts of a recipe; this is what gets cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeComposition {
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: PublicUser,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeDetail {
    pub fn assemble(recipe: Recipe, author: PublicUser, composition: RecipeComposition) -> Self {
        Self {
            id: recipe.id,
            tags: composition.tags,
            author,
            ingredients: composition.ingredients,
            is_favorited: recipe.is_favorited,
            is_in_shopping_cart: recipe.is_in_shopping_cart,
            name: recipe.name,
            image: media_url(&recipe.image),
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct ShortRecipe {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl ShortRecipe {
    pub fn with_media_url(mut self) -> Self {
        self.image = media_url(&self.image);
        self
    }
}

/// Per-user recipe lists. Both share one shape and differ only by table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListKind {
    Favorite,
    ShoppingCart,
}

impl ListKind {
    pub fn table(&self) -> &'static str {
        match self {
            ListKind::Favorite => "favorites",
            ListKind::ShoppingCart => "shopping_cart",
        }
    }

    pub fn already_listed(&self) -> &'static str {
        match self {
            ListKind::Favorite => "Recipe is already in favorites",
            ListKind::ShoppingCart => "Recipe is already in the shopping cart",
        }
    }

    pub fn not_listed(&self) -> &'static str {
        match self {
            ListKind::Favorite => "Recipe is not in favorites",
            ListKind::ShoppingCart => "Recipe is not in the shopping cart",
        }
    }
}

pub fn media_url(path: &str) -> String {
    format!("{MEDIA_URL_PREFIX}/{}", path.trim_start_matches('/'))
}
