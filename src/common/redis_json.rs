use redis::{FromRedisValue, RedisResult, Value};
use serde::Deserialize;
use std::fmt::Debug;

/// Decodes a redis string value holding a JSON document.
#[repr(transparent)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: for<'a> Deserialize<'a>> FromRedisValue for Json<T> {
    fn from_redis_value(v: &Value) -> RedisResult<Self> {
        let json_encoded = String::from_redis_value(v)?;
        let json_decoded: T =
            serde_json::from_str(&json_encoded).map_err(redis::RedisError::from)?;
        Ok(Json(json_decoded))
    }
}

impl<T: Debug> Debug for Json<T> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(fmt)
    }
}
