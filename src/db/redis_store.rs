use std::collections::HashMap;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use redis::AsyncCommands;

use crate::{
    db::{ReviewMutation, ReviewSnapshot, ReviewTxBody, Store, TxAttempt},
    errors::AppError,
    models::{Place, Review, redis::RedisKey},
};

pub type RedisClient = Pool<RedisConnectionManager>;

type RedisConn<'a> = PooledConnection<'a, RedisConnectionManager>;

#[derive(Clone)]
pub struct RedisStore {
    redis: RedisClient,
}

impl RedisStore {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }

    async fn conn(&self) -> Result<RedisConn<'_>, AppError> {
        Ok(self.redis.get().await?)
    }
}

async fn read_place(conn: &mut RedisConn<'_>, place_id: &str) -> Result<Option<Place>, AppError> {
    let data: HashMap<String, String> = conn
        .hgetall(RedisKey::place(place_id))
        .await
        .map_err(AppError::RedisCommandError)?;

    if data.is_empty() {
        return Ok(None);
    }

    Place::from_redis_hash(&data).map(Some)
}

async fn read_review(
    conn: &mut RedisConn<'_>,
    place_id: &str,
    user_id: &str,
) -> Result<Option<Review>, AppError> {
    let raw: Option<String> = conn
        .get(RedisKey::review(place_id, user_id))
        .await
        .map_err(AppError::RedisCommandError)?;

    raw.map(|json| {
        serde_json::from_str::<Review>(&json)
            .map_err(|e| AppError::Deserialization(format!("Invalid review JSON: {}", e)))
    })
    .transpose()
}

async fn read_snapshot(
    conn: &mut RedisConn<'_>,
    place_id: &str,
    user_id: &str,
) -> Result<ReviewSnapshot, AppError> {
    let place = read_place(conn, place_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Place {place_id} not found")))?;
    let review = read_review(conn, place_id, user_id).await?;
    Ok(ReviewSnapshot { place, review })
}

async fn unwatch(conn: &mut RedisConn<'_>) {
    if let Err(e) = redis::cmd("UNWATCH").query_async::<()>(&mut **conn).await {
        tracing::warn!("UNWATCH failed: {}", e);
    }
}

#[async_trait]
impl Store for RedisStore {
    // The hash and its index entry land in one MULTI/EXEC, or not at all.
    async fn insert_place(&self, place: &Place) -> Result<(), AppError> {
        let mut conn = self.conn().await?;
        let place_key = RedisKey::place(&place.id);
        let already_exists = || AppError::InvalidInput(format!("Place {} already exists", place.id));

        let _: () = redis::cmd("WATCH")
            .arg(&place_key)
            .query_async(&mut *conn)
            .await
            .map_err(AppError::RedisCommandError)?;

        let exists: bool = match conn.exists(&place_key).await {
            Ok(exists) => exists,
            Err(e) => {
                unwatch(&mut conn).await;
                return Err(AppError::RedisCommandError(e));
            }
        };
        if exists {
            unwatch(&mut conn).await;
            return Err(already_exists());
        }

        let fields: Vec<(String, String)> = place.to_redis_hash().into_iter().collect();
        let exec: Option<()> = redis::pipe()
            .atomic()
            .hset_multiple(&place_key, &fields)
            .ignore()
            .sadd(RedisKey::places(), &place.id)
            .ignore()
            .query_async(&mut *conn)
            .await
            .map_err(AppError::RedisCommandError)?;

        // Nil EXEC: another writer created the place after our check.
        if exec.is_none() {
            return Err(already_exists());
        }

        tracing::info!("Created place {} ({})", place.name, place.id);
        Ok(())
    }

    async fn get_place(&self, place_id: &str) -> Result<Option<Place>, AppError> {
        let mut conn = self.conn().await?;
        read_place(&mut conn, place_id).await
    }

    async fn list_places(&self) -> Result<Vec<Place>, AppError> {
        let mut conn = self.conn().await?;

        let ids: Vec<String> = conn
            .smembers(RedisKey::places())
            .await
            .map_err(AppError::RedisCommandError)?;

        let mut places = Vec::with_capacity(ids.len());
        for id in ids {
            match read_place(&mut conn, &id).await {
                Ok(Some(place)) => places.push(place),
                Ok(None) => tracing::warn!("Place {} indexed but missing", id),
                Err(e) => tracing::error!("Skipping unreadable place {}: {}", id, e),
            }
        }

        Ok(places)
    }

    async fn get_review(
        &self,
        place_id: &str,
        user_id: &str,
    ) -> Result<Option<Review>, AppError> {
        let mut conn = self.conn().await?;
        read_review(&mut conn, place_id, user_id).await
    }

    async fn list_reviews(&self, place_id: &str) -> Result<Vec<Review>, AppError> {
        let mut conn = self.conn().await?;

        let reviewers: Vec<String> = conn
            .smembers(RedisKey::place_reviewers(place_id))
            .await
            .map_err(AppError::RedisCommandError)?;

        let mut reviews = Vec::with_capacity(reviewers.len());
        for user_id in reviewers {
            if let Some(review) = read_review(&mut conn, place_id, &user_id).await? {
                reviews.push(review);
            }
        }

        Ok(reviews)
    }

    async fn try_review_tx(
        &self,
        place_id: &str,
        user_id: &str,
        body: &ReviewTxBody<'_>,
    ) -> Result<TxAttempt, AppError> {
        let mut conn = self.conn().await?;
        let place_key = RedisKey::place(place_id);
        let review_key = RedisKey::review(place_id, user_id);

        let _: () = redis::cmd("WATCH")
            .arg(&place_key)
            .arg(&review_key)
            .query_async(&mut *conn)
            .await
            .map_err(AppError::RedisCommandError)?;

        let snapshot = match read_snapshot(&mut conn, place_id, user_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                unwatch(&mut conn).await;
                return Err(e);
            }
        };
        let mutation = match body(&snapshot) {
            Ok(mutation) => mutation,
            Err(e) => {
                unwatch(&mut conn).await;
                return Err(e);
            }
        };
        let committed = mutation.committed_rating(&snapshot);

        let mut pipe = redis::pipe();
        pipe.atomic();
        match mutation {
            ReviewMutation::Put { review, rating } => {
                let json = serde_json::to_string(&review)
                    .map_err(|e| AppError::Serialization(e.to_string()));
                let json = match json {
                    Ok(json) => json,
                    Err(e) => {
                        unwatch(&mut conn).await;
                        return Err(e);
                    }
                };
                pipe.hset_multiple(&place_key, &rating.to_redis_fields())
                    .ignore()
                    .set(&review_key, json)
                    .ignore()
                    .sadd(RedisKey::place_reviewers(place_id), user_id)
                    .ignore();
            }
            ReviewMutation::Delete { rating } => {
                pipe.hset_multiple(&place_key, &rating.to_redis_fields())
                    .ignore()
                    .del(&review_key)
                    .ignore()
                    .srem(RedisKey::place_reviewers(place_id), user_id)
                    .ignore();
            }
            ReviewMutation::Unchanged => {
                unwatch(&mut conn).await;
                return Ok(TxAttempt::Committed(committed));
            }
        }

        // EXEC replies nil when a watched key changed.
        let exec: Option<()> = pipe
            .query_async(&mut *conn)
            .await
            .map_err(AppError::RedisCommandError)?;

        Ok(match exec {
            Some(()) => TxAttempt::Committed(committed),
            None => TxAttempt::Conflict,
        })
    }

    async fn set_favorite(
        &self,
        user_id: &str,
        place_id: &str,
        favorite: bool,
    ) -> Result<(), AppError> {
        let mut conn = self.conn().await?;
        let key = RedisKey::favorites(user_id);

        let _: () = if favorite {
            conn.sadd(&key, place_id).await
        } else {
            conn.srem(&key, place_id).await
        }
        .map_err(AppError::RedisCommandError)?;

        Ok(())
    }

    async fn list_favorite_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let mut conn = self.conn().await?;
        let mut ids: Vec<String> = conn
            .smembers(RedisKey::favorites(user_id))
            .await
            .map_err(AppError::RedisCommandError)?;
        ids.sort();
        Ok(ids)
    }
}
