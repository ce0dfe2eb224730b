use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use sea_orm::{
    DatabaseConnection, EntityTrait, QueryOrder, Set,
    sea_query::{Expr, OnConflict, Order},
};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{entities::movie, error::AppResult, models::Movie};

/// Persistence for movies, keyed by id.
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Insert or replace by id.
    async fn save(&self, movie: Movie) -> AppResult<Movie>;

    /// Snapshot of every stored movie at call time.
    async fn find_all(&self) -> AppResult<Vec<Movie>>;

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Movie>>;

    /// Absent records are ignored.
    async fn delete(&self, movie: &Movie) -> AppResult<()>;
}

#[derive(Clone)]
pub struct SqlMovieStore {
    db: DatabaseConnection,
}

impl SqlMovieStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MovieStore for SqlMovieStore {
    async fn save(&self, movie: Movie) -> AppResult<Movie> {
        let now = now_sec();
        let model = movie::ActiveModel {
            id: Set(movie.id.clone()),
            payload: Set(Value::Object(movie.fields.clone())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        movie::Entity::insert(model)
            .on_conflict(
                OnConflict::column(movie::Column::Id)
                    .update_columns([movie::Column::Payload, movie::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(movie)
    }

    async fn find_all(&self) -> AppResult<Vec<Movie>> {
        // rowid follows insertion and is untouched by the upsert's update arm.
        let rows = movie::Entity::find()
            .order_by(Expr::cust("rowid"), Order::Asc)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(into_movie).collect())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Movie>> {
        let row = movie::Entity::find_by_id(id.to_string()).one(&self.db).await?;
        Ok(row.map(into_movie))
    }

    async fn delete(&self, movie: &Movie) -> AppResult<()> {
        movie::Entity::delete_by_id(movie.id.clone()).exec(&self.db).await?;
        Ok(())
    }
}

fn into_movie(row: movie::Model) -> Movie {
    let fields = match row.payload {
        Value::Object(map) => map,
        other => {
            tracing::warn!(id = %row.id, payload = %other, "movie payload is not an object");
            Default::default()
        },
    };
    Movie::new(row.id, fields)
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[derive(Clone, Default)]
pub struct MemoryMovieStore {
    movies: Arc<RwLock<HashMap<String, Movie>>>,
}

impl MemoryMovieStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MovieStore for MemoryMovieStore {
    async fn save(&self, movie: Movie) -> AppResult<Movie> {
        self.movies.write().await.insert(movie.id.clone(), movie.clone());
        Ok(movie)
    }

    async fn find_all(&self) -> AppResult<Vec<Movie>> {
        Ok(self.movies.read().await.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Movie>> {
        Ok(self.movies.read().await.get(id).cloned())
    }

    async fn delete(&self, movie: &Movie) -> AppResult<()> {
        self.movies.write().await.remove(&movie.id);
        Ok(())
    }
}
