use crate::{
    authentication::cryptography::{hash_password, verify_password},
    error::{Error, FieldErrors, QueryError},
    jwt::SessionKeys,
    pagination::{Page, PageRequest},
    payload::Registration,
    schema::{Id, PublicUser, PublicUserRow, User},
};

use sqlx::{Pool, Postgres};

const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";

pub async fn get_user_by_email(email: &str, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(id: Id, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// `viewer` decides `is_subscribed`; anonymous viewers are never subscribed.
pub async fn find_public_user(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Option<PublicUser>, Error> {
    let row: Option<PublicUser> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS(SELECT 1 FROM subscriptions s WHERE s.user_id = $2 AND s.author_id = u.id) AS is_subscribed
        FROM users u
        WHERE u.id = $1
    ",
    )
    .bind(id)
    .bind(viewer)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_public_user(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<PublicUser, Error> {
    find_public_user(id, viewer, pool)
        .await?
        .ok_or_else(|| Error::NotFound("No user exists with specified id".to_owned()))
}

pub async fn list_users(
    request: &PageRequest,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Page<PublicUser>, Error> {
    let rows: Vec<PublicUserRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS(SELECT 1 FROM subscriptions s WHERE s.user_id = $1 AND s.author_id = u.id) AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(viewer)
    .bind(request.limit)
    .bind(request.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    request.check_in_range(rows.len())?;
    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let users = rows.into_iter().map(|row| row.user).collect();

    Ok(Page::from_rows(users, total_count, request))
}

/// Creates a user. The unique constraints on email and username decide
/// duplicates; a skipped insert is reported per colliding field.
pub async fn register_user(
    registration: Registration,
    pool: &Pool<Postgres>,
) -> Result<PublicUser, Error> {
    let password = hash_password(&registration.password)?;

    let row: Option<PublicUser> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING
        RETURNING id, email, username, first_name, last_name, FALSE AS is_subscribed
    ",
    )
    .bind(&registration.email)
    .bind(&registration.username)
    .bind(&registration.first_name)
    .bind(&registration.last_name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match row {
        Some(user) => {
            log::info!("Registered user {} ({})", user.username, user.id);
            Ok(user)
        }
        None => Err(duplicate_fields(&registration, pool).await),
    }
}

async fn duplicate_fields(registration: &Registration, pool: &Pool<Postgres>) -> Error {
    let taken: Result<(bool, bool), sqlx::Error> = sqlx::query_as(
        "
        SELECT
            EXISTS(SELECT 1 FROM users WHERE email = $1),
            EXISTS(SELECT 1 FROM users WHERE username = $2)
    ",
    )
    .bind(&registration.email)
    .bind(&registration.username)
    .fetch_one(pool)
    .await;

    let (email_taken, username_taken) = match taken {
        Ok(taken) => taken,
        Err(e) => return QueryError::from(e).into(),
    };

    let mut errors = FieldErrors::new();
    if email_taken {
        errors.insert(
            "email".to_owned(),
            vec!["A user with that email already exists.".to_owned()],
        );
    }
    if username_taken {
        errors.insert(
            "username".to_owned(),
            vec!["A user with that username already exists.".to_owned()],
        );
    }
    if errors.is_empty() {
        // the colliding row was deleted in between
        return Error::Conflict("User could not be registered, try again".to_owned());
    }

    Error::Validation(errors)
}

/// Exchanges credentials for a signed session token.
pub async fn login_user(
    email: &str,
    password: &str,
    keys: &SessionKeys,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = get_user_by_email(email, pool)
        .await?
        .ok_or_else(|| Error::field("non_field_errors", INVALID_CREDENTIALS))?;

    if !verify_password(password, &user.password)? {
        return Err(Error::field("non_field_errors", INVALID_CREDENTIALS));
    }

    keys.generate(&user)
}

pub async fn set_password(
    user_id: Id,
    current_password: &str,
    new_password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let user = get_user_by_id(user_id, pool)
        .await?
        .ok_or_else(|| Error::Unauthorized("User no longer exists".to_owned()))?;

    if !verify_password(current_password, &user.password)? {
        return Err(Error::field("current_password", "Wrong password."));
    }

    let password = hash_password(new_password)?;
    sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
        .bind(user_id)
        .bind(password)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
