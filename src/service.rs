use std::{sync::Arc, time::Duration};

use futures::{StreamExt, stream::BoxStream};
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Movie,
    store::MovieStore,
};

/// The four movie operations. Holds no state besides its store handle.
#[derive(Clone)]
pub struct MovieService {
    store: Arc<dyn MovieStore>,
    list_delay: Duration,
}

impl MovieService {
    pub fn new(store: Arc<dyn MovieStore>, list_delay: Duration) -> Self {
        Self { store, list_delay }
    }

    /// Stores `movie` under a freshly generated id; any incoming id is dropped.
    pub async fn create(&self, mut movie: Movie) -> AppResult<Movie> {
        movie.id = Uuid::new_v4().to_string();
        let saved = self.store.save(movie).await?;
        debug!(id = %saved.id, "created movie");
        Ok(saved)
    }

    /// Every stored movie, each one released only after `list_delay` has passed.
    ///
    /// The set is fixed when this is called. Dropping the stream stops it.
    pub async fn list(&self) -> AppResult<BoxStream<'static, Movie>> {
        let movies = self.store.find_all().await?;
        let delay = self.list_delay;
        debug!(count = movies.len(), delay_ms = delay.as_millis() as u64, "listing movies");

        Ok(futures::stream::iter(movies)
            .then(move |movie| async move {
                tokio::time::sleep(delay).await;
                movie
            })
            .boxed())
    }

    /// Upsert by id.
    pub async fn update(&self, movie: Movie) -> AppResult<Movie> {
        if !movie.has_id() {
            return Err(AppError::BadRequest("id is required".to_string()));
        }
        let saved = self.store.save(movie).await?;
        debug!(id = %saved.id, "updated movie");
        Ok(saved)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let Some(movie) = self.store.find_by_id(id).await? else {
            return Err(AppError::NotFound(id.to_string()));
        };
        self.store.delete(&movie).await?;
        debug!(id = %id, "deleted movie");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Instant,
    };

    use serde_json::{Map, json};

    use super::*;
    use crate::store::MemoryMovieStore;

    /// Counts every read that reaches the wrapped store.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryMovieStore,
        reads: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MovieStore for CountingStore {
        async fn save(&self, movie: Movie) -> AppResult<Movie> {
            self.inner.save(movie).await
        }

        async fn find_all(&self) -> AppResult<Vec<Movie>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.find_all().await
        }

        async fn find_by_id(&self, id: &str) -> AppResult<Option<Movie>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_id(id).await
        }

        async fn delete(&self, movie: &Movie) -> AppResult<()> {
            self.inner.delete(movie).await
        }
    }

    fn payload(value: serde_json::Value) -> Movie {
        serde_json::from_value(value).unwrap()
    }

    fn service(delay: Duration) -> (MovieService, Arc<MemoryMovieStore>) {
        let store = Arc::new(MemoryMovieStore::new());
        (MovieService::new(store.clone(), delay), store)
    }

    #[tokio::test]
    async fn create_assigns_fresh_id() {
        let (svc, store) = service(Duration::ZERO);

        let created = svc.create(payload(json!({ "id": "mine", "title": "Dune" }))).await.unwrap();

        assert!(created.has_id());
        assert_ne!(created.id, "mine");
        assert_eq!(created.fields["title"], "Dune");
        assert_eq!(store.find_by_id(&created.id).await.unwrap(), Some(created.clone()));
        assert_eq!(store.find_by_id("mine").await.unwrap(), None);
    }

    #[tokio::test]
    async fn create_ids_are_unique() {
        let (svc, _) = service(Duration::ZERO);
        let a = svc.create(Movie::default()).await.unwrap();
        let b = svc.create(Movie::default()).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn update_replaces_existing() {
        let (svc, store) = service(Duration::ZERO);
        let created = svc.create(payload(json!({ "title": "Dune", "year": 1984 }))).await.unwrap();

        let replacement = payload(json!({ "id": created.id, "title": "Dune: Part One" }));
        let updated = svc.update(replacement.clone()).await.unwrap();

        assert_eq!(updated, replacement);
        let stored = store.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(stored, replacement);
        assert!(!stored.fields.contains_key("year"));
    }

    #[tokio::test]
    async fn update_unknown_id_creates() {
        let (svc, store) = service(Duration::ZERO);
        let movie = payload(json!({ "id": "fresh", "title": "Heat" }));

        svc.update(movie.clone()).await.unwrap();

        assert_eq!(store.find_by_id("fresh").await.unwrap(), Some(movie));
    }

    #[tokio::test]
    async fn update_without_id_is_rejected() {
        let (svc, store) = service(Duration::ZERO);
        let err = svc.update(Movie::new("  ", Map::new())).await.unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_existing_then_missing() {
        let (svc, store) = service(Duration::ZERO);
        let created = svc.create(payload(json!({ "title": "Alien" }))).await.unwrap();

        svc.delete(&created.id).await.unwrap();
        assert_eq!(store.find_by_id(&created.id).await.unwrap(), None);

        let err = svc.delete(&created.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref id) if *id == created.id));
    }

    #[tokio::test]
    async fn delete_missing_leaves_store_alone() {
        let (svc, store) = service(Duration::ZERO);
        svc.create(payload(json!({ "title": "Alien" }))).await.unwrap();

        assert!(matches!(svc.delete("nope").await, Err(AppError::NotFound(_))));
        assert_eq!(store.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_paces_every_element() {
        let delay = Duration::from_millis(40);
        let (svc, _) = service(delay);
        let mut ids = Vec::new();
        for title in ["A", "B", "C"] {
            ids.push(svc.create(payload(json!({ "title": title }))).await.unwrap().id);
        }

        let mut stream = svc.list().await.unwrap();
        let mut last = Instant::now();
        let mut seen = Vec::new();
        while let Some(movie) = stream.next().await {
            let now = Instant::now();
            assert!(now.duration_since(last) >= delay);
            last = now;
            seen.push(movie.id);
        }

        seen.sort();
        ids.sort();
        assert_eq!(seen, ids);
    }

    #[tokio::test]
    async fn list_is_a_snapshot() {
        let (svc, _) = service(Duration::ZERO);
        svc.create(Movie::default()).await.unwrap();

        let stream = svc.list().await.unwrap();
        svc.create(Movie::default()).await.unwrap();

        assert_eq!(stream.collect::<Vec<_>>().await.len(), 1);
    }

    #[tokio::test]
    async fn dropped_list_stops_after_first_movie() {
        let delay = Duration::from_millis(100);
        let store = Arc::new(CountingStore::default());
        let svc = MovieService::new(store.clone(), delay);
        for title in ["A", "B", "C"] {
            svc.create(payload(json!({ "title": title }))).await.unwrap();
        }

        let started = Instant::now();
        let mut stream = svc.list().await.unwrap();
        assert!(stream.next().await.is_some());
        let first = started.elapsed();
        drop(stream);

        // One paced element, not the whole batch.
        assert!(first >= delay);
        assert!(first < delay * 3);

        tokio::time::sleep(delay * 3).await;
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }
}
