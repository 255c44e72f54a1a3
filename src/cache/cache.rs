use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Error};

// Caching - keys

#[derive(Serialize, Clone, Debug)]
pub struct CacheKey<T: ToString + Serialize> {
    _value: T,
    _type: CacheKeyType,
}

impl<T: ToString + Serialize> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self {
            _value: key,
            _type: r#type,
        }
    }

    pub fn lifetime(&self) -> CacheLifetime {
        match self._type {
            CacheKeyType::Recipe => CacheLifetime::BindRecipeCache,
            CacheKeyType::Ingredients => CacheLifetime::BindIngredientCache,
            CacheKeyType::Tags => CacheLifetime::BindTagCache,
        }
    }
}

impl<T: ToString + Serialize> std::fmt::Display for CacheKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self._type {
            CacheKeyType::Recipe => write!(f, "recipe-{}", self._value.to_string()),
            CacheKeyType::Ingredients => write!(f, "ingredients-{}", self._value.to_string()),
            CacheKeyType::Tags => write!(f, "tags-{}", self._value.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CacheKeyType {
    Recipe,
    Ingredients,
    Tags,
}

impl CacheKeyType {
    pub fn new<T: ToString + Serialize>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

// Cache - generations

/// Every cached value remembers the generation of its bind key when it was
/// written. Bumping the generation invalidates all values bound to it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CacheLifetime {
    BindRecipeCache,
    BindIngredientCache,
    BindTagCache,
}

impl CacheLifetime {
    fn bind_key(&self) -> &'static str {
        match self {
            CacheLifetime::BindRecipeCache => "recipe-cache-key",
            CacheLifetime::BindIngredientCache => "ingredient-cache-key",
            CacheLifetime::BindTagCache => "tag-cache-key",
        }
    }

    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<i64>, CacheError> {
        get_cache_value::<&str, i64>(self.bind_key(), cache).await
    }

    pub async fn bump(&self, cache: &mut MultiplexedConnection) -> Result<i64, CacheError> {
        let generation: i64 = cache.incr(self.bind_key(), 1).await?;
        Ok(generation)
    }
}

// Cache - wrappers

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct RedisValue<T: Serialize + Send + Sync + Clone> {
    pub value: T,
    _lifetime: CacheLifetime,
    _bind: Option<i64>,
}

impl<T> RedisValue<T>
where
    T: Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>,
{
    async fn new(
        value: T,
        lifetime: CacheLifetime,
        cache: &mut MultiplexedConnection,
    ) -> Result<Self, CacheError> {
        let bind = lifetime.get_cache_bind(cache).await?;

        Ok(Self {
            value,
            _lifetime: lifetime,
            _bind: bind,
        })
    }

    async fn validate(&self, cache: &mut MultiplexedConnection) -> Result<bool, CacheError> {
        Ok(self._bind == self._lifetime.get_cache_bind(cache).await?)
    }

    /// Returns the cached value when its generation is current, otherwise runs
    /// `callback` and stores the result. Cache faults are logged and fall
    /// through to `callback`; only `callback` errors reach the caller.
    pub async fn get_or<F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<T, Error>
    where
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, Error>> + Send,
    {
        let name = key.to_string();

        let value = get_cache_value::<&str, RedisValue<T>>(&name, cache)
            .await
            .unwrap_or_else(|e| {
                let mut c = cache.clone();
                let k = name.clone();
                tokio::spawn(async move {
                    log::error!("> Failed to read cached value {k} ({e}). Deleting it");
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e}");
                    }
                });
                None
            });

        // * Cannot use .map(|| {...}) due to async closures
        if let Some(value) = value {
            match value.validate(cache).await {
                Ok(true) => {
                    log::trace!("> Found {name}");
                    return Ok(value.value);
                }
                Ok(false) => log::trace!("> Invalidated {name}"),
                Err(e) => log::warn!("> Failed to validate {name}: {e}"),
            }
        }

        log::trace!("> Fetching {name}");
        let value = callback().await?;

        match RedisValue::new(value.clone(), key.lifetime(), cache).await {
            Ok(cached) => {
                if let Err(e) = set_cache_value(&name, cached, cache).await {
                    log::error!("> Failed to store {name}: {e}");
                }
            }
            Err(e) => log::error!("> Failed to read generation for {name}: {e}"),
        }

        Ok(value)
    }
}

/// Connection-per-request front for the Redis cache. When Redis cannot be
/// reached the request is served straight from the store.
#[derive(Clone, Debug)]
pub struct Cache {
    client: redis::Client,
}

impl Cache {
    pub fn open(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Option<MultiplexedConnection> {
        match self.client.get_multiplexed_async_connection().await {
            Ok(connection) => Some(connection),
            Err(e) => {
                log::warn!("Cache unavailable: {}", CacheError::from(e));
                None
            }
        }
    }

    pub async fn get_or<T, F, Fut, K>(&self, key: CacheKey<K>, callback: F) -> Result<T, Error>
    where
        T: Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>,
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, Error>> + Send,
    {
        match self.connection().await {
            Some(mut connection) => RedisValue::get_or(key, &mut connection, callback).await,
            None => callback().await,
        }
    }

    /// Drops every value bound to `lifetime`. Best effort: a failure is logged.
    pub async fn invalidate(&self, lifetime: CacheLifetime) {
        if let Some(mut connection) = self.connection().await {
            match lifetime.bump(&mut connection).await {
                Ok(generation) => log::debug!("{lifetime:?} moved to generation {generation}"),
                Err(e) => log::error!("Failed to invalidate {lifetime:?}: {e}"),
            }
        }
    }
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), CacheError> {
    let _: () = cache.set(key, value).await?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), CacheError> {
    let _: () = cache.del(key).await?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, CacheError> {
    let value: Option<V> = cache.get(key).await?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_type() {
        assert_eq!(CacheKeyType::Recipe.new(12).to_string(), "recipe-12");
        assert_eq!(CacheKeyType::Ingredients.new("мук").to_string(), "ingredients-мук");
        assert_eq!(CacheKeyType::Tags.new("all").to_string(), "tags-all");
    }

    #[test]
    fn keys_bind_to_their_generation() {
        assert_eq!(
            CacheKeyType::Recipe.new(1).lifetime(),
            CacheLifetime::BindRecipeCache
        );
        assert_eq!(
            CacheKeyType::Ingredients.new("").lifetime(),
            CacheLifetime::BindIngredientCache
        );
        assert_eq!(CacheKeyType::Tags.new("all").lifetime(), CacheLifetime::BindTagCache);
    }

    #[test]
    fn opening_does_not_connect() {
        assert!(Cache::open("redis://127.0.0.1:6390/").is_ok());
        assert!(Cache::open("not a url").is_err());
    }
}
