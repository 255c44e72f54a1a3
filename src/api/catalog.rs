use warp::{reject::Rejection, reply::Response};

use crate::{
    actions::{create_tag, get_ingredient, get_tag, list_ingredients, list_tags},
    form::Form,
    jwt::SessionData,
    payload::NewTag,
    permissions::ActionType,
    schema::Id,
};

use super::{reply, state::SharedState};

pub async fn tags(state: SharedState) -> Result<Response, Rejection> {
    let tags = list_tags(&state.cache, &state.pool).await?;

    Ok(reply::ok(&tags))
}

pub async fn tag(id: Id, state: SharedState) -> Result<Response, Rejection> {
    let tag = get_tag(id, &state.pool).await?;

    Ok(reply::ok(&tag))
}

pub async fn new_tag(
    state: SharedState,
    session: SessionData,
    body: NewTag,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageTags)?;
    let tag = body.validate()?;
    let tag = create_tag(tag, &state.cache, &state.pool).await?;

    Ok(reply::created(&tag))
}

pub async fn ingredients(state: SharedState, form: Form) -> Result<Response, Rejection> {
    let ingredients = list_ingredients(form.get_str("name"), &state.cache, &state.pool).await?;

    Ok(reply::ok(&ingredients))
}

pub async fn ingredient(id: Id, state: SharedState) -> Result<Response, Rejection> {
    let ingredient = get_ingredient(id, &state.pool).await?;

    Ok(reply::ok(&ingredient))
}
