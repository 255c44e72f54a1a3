use std::{convert::Infallible, sync::Arc};

use sqlx::{Pool, Postgres};
use warp::Filter;

use crate::{cache::cache::Cache, config::Config, error::Error, jwt::SessionKeys, media::ImageStore};

/// Everything a handler may reach: the store, the cache, session keys and
/// the image directory.
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub cache: Cache,
    pub keys: SessionKeys,
    pub media: ImageStore,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: &Config, pool: Pool<Postgres>) -> Result<Self, Error> {
        Ok(Self {
            pool,
            cache: Cache::open(&config.redis_url)?,
            keys: SessionKeys::new(config.jwt_secret.as_bytes(), config.token_lifetime())?,
            media: ImageStore::new(config.media_root.clone()),
        })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}

pub fn with_state(
    state: SharedState,
) -> impl Filter<Extract = (SharedState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}
