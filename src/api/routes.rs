use std::convert::Infallible;

use serde::de::DeserializeOwned;
use warp::{
    filters::BoxedFilter,
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::{
    form::Form,
    middleware::{with_possible_session, with_session},
    payload::{Credentials, NewTag, NewUser, PasswordChange, RecipeForm},
    schema::{Id, ListKind},
    MAX_JSON_BODY,
};

use super::{
    catalog, recipes,
    reply::handle_rejection,
    state::{with_state, SharedState},
    users,
};

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_JSON_BODY).and(warp::body::json())
}

/// The query string as a `Form`; a request without one gets an empty form.
fn with_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::query::raw()
        .or_else(|_| async { Ok::<_, Rejection>((String::new(),)) })
        .map(|raw: String| Form::from_query(&raw))
}

/// Every endpoint, with access logging and rejection handling.
pub fn routes(state: SharedState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let media = warp::path("media")
        .and(warp::fs::dir(state.media.root().to_path_buf()))
        .map(|file: warp::fs::File| file.into_response());

    user_routes(state.clone())
        .or(catalog_routes(state.clone()))
        .unify()
        .or(recipe_routes(state))
        .unify()
        .or(media)
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log("recipe_share::api"))
}

fn user_routes(state: SharedState) -> BoxedFilter<(Response,)> {
    let keys = state.keys.clone();

    let register = warp::path!("api" / "users")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body::<NewUser>())
        .and_then(users::register);

    let list = warp::path!("api" / "users")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_possible_session(keys.clone()))
        .and(with_form())
        .and_then(users::list);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and_then(users::me);

    let set_password = warp::path!("api" / "users" / "set_password")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(json_body::<PasswordChange>())
        .and_then(users::change_password);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(with_form())
        .and_then(users::subscriptions);

    let get = warp::path!("api" / "users" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_possible_session(keys.clone()))
        .and_then(users::get);

    let subscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(with_form())
        .and_then(users::follow);

    let unsubscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(with_session(keys))
        .and_then(users::unfollow);

    let login = warp::path!("api" / "auth" / "token" / "login")
        .and(warp::post())
        .and(with_state(state))
        .and(json_body::<Credentials>())
        .and_then(users::login);

    register
        .or(list)
        .unify()
        .or(me)
        .unify()
        .or(set_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(get)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .or(login)
        .unify()
        .boxed()
}

fn catalog_routes(state: SharedState) -> BoxedFilter<(Response,)> {
    let tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(catalog::tags);

    let tag = warp::path!("api" / "tags" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(catalog::tag);

    let new_tag = warp::path!("api" / "tags")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(state.keys.clone()))
        .and(json_body::<NewTag>())
        .and_then(catalog::new_tag);

    let ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_form())
        .and_then(catalog::ingredients);

    let ingredient = warp::path!("api" / "ingredients" / Id)
        .and(warp::get())
        .and(with_state(state))
        .and_then(catalog::ingredient);

    tags.or(tag)
        .unify()
        .or(new_tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
        .boxed()
}

fn recipe_routes(state: SharedState) -> BoxedFilter<(Response,)> {
    let keys = state.keys.clone();

    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_possible_session(keys.clone()))
        .and(with_form())
        .and_then(recipes::list);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(json_body::<RecipeForm>())
        .and_then(recipes::create);

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_possible_session(keys.clone()))
        .and_then(recipes::download_shopping_cart);

    let get = warp::path!("api" / "recipes" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_possible_session(keys.clone()))
        .and_then(recipes::get);

    let update = warp::path!("api" / "recipes" / Id)
        .and(warp::patch())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(json_body::<RecipeForm>())
        .and_then(recipes::update);

    let delete = warp::path!("api" / "recipes" / Id)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(with_session(keys))
        .and_then(recipes::delete);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(list_routes(state.clone(), ListKind::Favorite, "favorite"))
        .unify()
        .or(list_routes(state, ListKind::ShoppingCart, "shopping_cart"))
        .unify()
        .boxed()
}

/// `POST` puts the recipe on the list, `DELETE` takes it off.
fn list_routes(state: SharedState, kind: ListKind, segment: &'static str) -> BoxedFilter<(Response,)> {
    let path = warp::path("api")
        .and(warp::path("recipes"))
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = path
        .clone()
        .and(warp::post())
        .and(warp::any().map(move || kind))
        .and(with_state(state.clone()))
        .and(with_session(state.keys.clone()))
        .and_then(recipes::add);

    let remove = path
        .and(warp::delete())
        .and(warp::any().map(move || kind))
        .and(with_state(state.clone()))
        .and(with_session(state.keys.clone()))
        .and_then(recipes::remove);

    add.or(remove).unify().boxed()
}
