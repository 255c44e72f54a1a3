use serde_json::json;
use warp::{reject::Rejection, reply::Response};

use crate::{
    actions::{
        get_public_user, list_subscriptions, list_users, login_user, recipes_limit,
        register_user, set_password, subscribe, unsubscribe,
    },
    error::Error,
    form::Form,
    jwt::SessionData,
    pagination::PageRequest,
    payload::{Credentials, NewUser, PasswordChange},
    permissions::ActionType,
    schema::Id,
    USER_COUNT_PER_PAGE,
};

use super::{reply, state::SharedState};

pub async fn register(state: SharedState, body: NewUser) -> Result<Response, Rejection> {
    let registration = body.validate()?;
    let user = register_user(registration, &state.pool).await?;

    Ok(reply::created(&user))
}

pub async fn login(state: SharedState, body: Credentials) -> Result<Response, Rejection> {
    let (email, password) = body.validate()?;
    let token = login_user(&email, &password, &state.keys, &state.pool).await?;

    Ok(reply::ok(&json!({ "auth_token": token })))
}

pub async fn list(
    state: SharedState,
    session: Option<SessionData>,
    form: Form,
) -> Result<Response, Rejection> {
    let request = PageRequest::from_form(&form, USER_COUNT_PER_PAGE).map_err(Error::from)?;
    let viewer = session.map(|s| s.user_id);
    let page = list_users(&request, viewer, &state.pool).await?;

    Ok(reply::ok(&page))
}

pub async fn me(state: SharedState, session: SessionData) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnProfile)?;
    let user = get_public_user(session.user_id, Some(session.user_id), &state.pool).await?;

    Ok(reply::ok(&user))
}

pub async fn change_password(
    state: SharedState,
    session: SessionData,
    body: PasswordChange,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnProfile)?;
    let (current, new) = body.validate()?;
    set_password(session.user_id, &current, &new, &state.pool).await?;

    Ok(reply::no_content())
}

pub async fn get(
    id: Id,
    state: SharedState,
    session: Option<SessionData>,
) -> Result<Response, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let user = get_public_user(id, viewer, &state.pool).await?;

    Ok(reply::ok(&user))
}

pub async fn subscriptions(
    state: SharedState,
    session: SessionData,
    form: Form,
) -> Result<Response, Rejection> {
    let request = PageRequest::from_form(&form, USER_COUNT_PER_PAGE).map_err(Error::from)?;
    let limit = recipes_limit(&form).map_err(Error::from)?;
    let page = list_subscriptions(&session, &request, limit, &state.pool).await?;

    Ok(reply::ok(&page))
}

pub async fn follow(
    id: Id,
    state: SharedState,
    session: SessionData,
    form: Form,
) -> Result<Response, Rejection> {
    let limit = recipes_limit(&form).map_err(Error::from)?;
    let author = subscribe(&session, id, limit, &state.pool).await?;

    Ok(reply::created(&author))
}

pub async fn unfollow(
    id: Id,
    state: SharedState,
    session: SessionData,
) -> Result<Response, Rejection> {
    unsubscribe(&session, id, &state.pool).await?;

    Ok(reply::no_content())
}
