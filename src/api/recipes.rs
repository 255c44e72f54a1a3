use warp::{reject::Rejection, reply::Response};

use crate::{
    actions::{
        add_to_list, build_shopping_list, check_references, create_recipe, delete_recipe,
        fetch_recipes, get_recipe_detail, get_recipe_mut, remove_from_list, update_recipe,
        RecipeFilter,
    },
    error::Error,
    form::Form,
    jwt::SessionData,
    pagination::PageRequest,
    payload::RecipeForm,
    permissions::ActionType,
    schema::{Id, ListKind},
    RECIPE_COUNT_PER_PAGE, SHOPPING_LIST_FILENAME,
};

use super::{reply, state::SharedState};

pub async fn list(
    state: SharedState,
    session: Option<SessionData>,
    form: Form,
) -> Result<Response, Rejection> {
    let request = PageRequest::from_form(&form, RECIPE_COUNT_PER_PAGE).map_err(Error::from)?;
    let filter = RecipeFilter::from_form(&form).map_err(Error::from)?;
    let viewer = session.map(|s| s.user_id);

    let page = fetch_recipes(&filter, &request, viewer, &state.pool).await?;

    Ok(reply::ok(&page))
}

pub async fn get(
    id: Id,
    state: SharedState,
    session: Option<SessionData>,
) -> Result<Response, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let recipe = get_recipe_detail(id, viewer, &state.cache, &state.pool).await?;

    Ok(reply::ok(&recipe))
}

pub async fn create(
    state: SharedState,
    session: SessionData,
    body: RecipeForm,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::CreateRecipes)?;
    let recipe = body.validate(true)?;
    check_references(&recipe, &state.pool).await?;

    let image = recipe
        .image
        .as_deref()
        .ok_or_else(|| Error::field("image", "This field is required."))?;
    let image = state.media.save_data_uri(image).await?;

    let id = match create_recipe(session.user_id, &recipe, &image, &state.pool).await {
        Ok(id) => id,
        Err(e) => {
            state.media.remove(&image).await;
            return Err(e.into());
        }
    };

    let detail = get_recipe_detail(id, Some(session.user_id), &state.cache, &state.pool).await?;
    Ok(reply::created(&detail))
}

pub async fn update(
    id: Id,
    state: SharedState,
    session: SessionData,
    body: RecipeForm,
) -> Result<Response, Rejection> {
    let current = get_recipe_mut(id, &session, &state.pool).await?;
    let recipe = body.validate(false)?;
    check_references(&recipe, &state.pool).await?;

    let image = match &recipe.image {
        Some(data) => Some(state.media.save_data_uri(data).await?),
        None => None,
    };

    if let Err(e) = update_recipe(id, &recipe, image.as_deref(), &state.cache, &state.pool).await {
        if let Some(image) = &image {
            state.media.remove(image).await;
        }
        return Err(e.into());
    }
    if image.is_some() {
        state.media.remove(&current.image).await;
    }

    let detail = get_recipe_detail(id, Some(session.user_id), &state.cache, &state.pool).await?;
    Ok(reply::ok(&detail))
}

pub async fn delete(
    id: Id,
    state: SharedState,
    session: SessionData,
) -> Result<Response, Rejection> {
    let recipe = get_recipe_mut(id, &session, &state.pool).await?;
    delete_recipe(recipe.id, &state.cache, &state.pool).await?;
    state.media.remove(&recipe.image).await;

    Ok(reply::no_content())
}

pub async fn add(
    id: Id,
    kind: ListKind,
    state: SharedState,
    session: SessionData,
) -> Result<Response, Rejection> {
    let recipe = add_to_list(kind, &session, id, &state.pool).await?;

    Ok(reply::created(&recipe))
}

pub async fn remove(
    id: Id,
    kind: ListKind,
    state: SharedState,
    session: SessionData,
) -> Result<Response, Rejection> {
    remove_from_list(kind, &session, id, &state.pool).await?;

    Ok(reply::no_content())
}

/// Anonymous requests reach here too and are refused by the list builder.
pub async fn download_shopping_cart(
    state: SharedState,
    session: Option<SessionData>,
) -> Result<Response, Rejection> {
    let list = build_shopping_list(session.as_ref(), &state.pool).await?;

    Ok(reply::attachment(list.render(), SHOPPING_LIST_FILENAME))
}
