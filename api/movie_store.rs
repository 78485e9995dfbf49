use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use lib::prelude::*;
use sea_orm::{
    ActiveModelTrait,
    ColumnTrait,
    ConnectionTrait,
    DbErr,
    EntityTrait,
    LoaderTrait,
    PaginatorTrait,
    QueryFilter,
    QueryOrder,
    QuerySelect,
    Set,
    SqlErr,
    TransactionTrait,
};
use thiserror::Error;
use tracing::debug;

use crate::db_model::{
    movie_details,
    movie_genres,
    movie_user_likes,
    movies,
    Director,
    Directors,
    Genre,
    Genres,
    Movie,
    MovieDetail,
    MovieDetails,
    MovieGenres,
    MovieUserLikes,
    Movies,
};

/// Movie files are stored (by an out-of-band uploader) under this prefix.
pub const MOVIE_FILE_DIR: &str = "public/movie";

#[derive(Error, Debug)]
pub enum MovieStoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error("movie {0} doesn't exist")]
    MovieNotFound(i32),
    #[error("director {0} doesn't exist")]
    DirectorNotFound(i32),
    #[error("some genres don't exist, existing ids: {found:?}")]
    GenresNotFound { found: Vec<i32> },
    #[error("a movie titled '{0}' already exists")]
    DuplicateTitle(String),
}

impl From<DbErr> for MovieStoreError {
    fn from(value: DbErr) -> Self {
        Self::Database(value.into())
    }
}

/// A movie together with everything it references.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieWithRelations {
    pub movie: Movie,
    pub detail: Option<MovieDetail>,
    pub director: Option<Director>,
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone)]
pub struct NewMovie {
    pub title: String,
    pub detail: String,
    pub director_id: i32,
    pub genre_ids: Vec<i32>,
    pub movie_file_name: String,
}

#[derive(Debug, Default, Clone)]
pub struct MovieChanges {
    pub title: Option<String>,
    pub detail: Option<String>,
    pub director_id: Option<i32>,
    pub genre_ids: Option<Vec<i32>>,
}

#[derive(Debug)]
pub struct MoviePage {
    pub page: PaginatedResponse<MovieWithRelations>,
    /// Rows matching the filter, regardless of cursor and page size.
    pub count: u64,
}

#[derive(Clone)]
pub struct MovieStore {
    db: Database,
}

impl MovieStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        title: Option<&str>,
        page: &PageQuery,
    ) -> Result<MoviePage, MovieStoreError> {
        let mut select = Movies::find();
        if let Some(title) = title {
            select = select.filter(movies::Column::Title.contains(title));
        }
        let count = select.clone().count(&self.db.orm).await?;

        let rows = select.with_pagination(page)?.all(&self.db.orm).await?;
        let paginated = PaginatedResponse::paginate(rows, page)?;
        let data = with_relations(&self.db.orm, paginated.data).await?;

        Ok(MoviePage {
            page: PaginatedResponse {
                data,
                next_cursor: paginated.next_cursor,
            },
            count,
        })
    }

    /// The `limit` most recently created movies, newest first.
    pub async fn recent(
        &self,
        limit: u64,
    ) -> Result<Vec<MovieWithRelations>, MovieStoreError> {
        let rows = Movies::find()
            .order_by_desc(movies::Column::CreatedAt)
            .order_by_desc(movies::Column::Id)
            .limit(Some(limit))
            .all(&self.db.orm)
            .await?;
        with_relations(&self.db.orm, rows).await
    }

    pub async fn get(
        &self,
        id: i32,
    ) -> Result<Option<MovieWithRelations>, MovieStoreError> {
        let Some(movie) = Movies::find_by_id(id).one(&self.db.orm).await?
        else {
            return Ok(None);
        };
        Ok(with_relations(&self.db.orm, vec![movie]).await?.pop())
    }

    /// The caller's reaction to each of `movie_ids` that they reacted to.
    pub async fn like_statuses(
        &self,
        user_id: i32,
        movie_ids: &[i32],
    ) -> Result<HashMap<i32, bool>, MovieStoreError> {
        if movie_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let records = MovieUserLikes::find()
            .filter(movie_user_likes::Column::UserId.eq(user_id))
            .filter(movie_user_likes::Column::MovieId.is_in(movie_ids.to_vec()))
            .all(&self.db.orm)
            .await?;
        Ok(records.into_iter().map(|r| (r.movie_id, r.is_like)).collect())
    }

    pub async fn create(
        &self,
        new: NewMovie,
        creator_id: i32,
    ) -> Result<MovieWithRelations, MovieStoreError> {
        let txn = self.db.orm.begin().await?;

        ensure_director(&txn, new.director_id).await?;
        let genre_ids: Vec<i32> = ensure_genres(&txn, &new.genre_ids)
            .await?
            .into_iter()
            .collect();
        ensure_unique_title(&txn, &new.title, None).await?;

        let detail = movie_details::ActiveModel {
            detail: Set(new.detail),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let now = Utc::now();
        let movie = movies::ActiveModel {
            title: Set(new.title.clone()),
            detail_id: Set(detail.id),
            director_id: Set(new.director_id),
            creator_id: Set(Some(creator_id)),
            movie_file_path: Set(format!(
                "{MOVIE_FILE_DIR}/{}",
                new.movie_file_name
            )),
            like_count: Set(0),
            dislike_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| map_unique_title(e, &new.title))?;

        let movie_id = movie.id;
        GenreLinks::add(&txn, movie_id, &genre_ids).await?;

        let created = with_relations(&txn, vec![movie])
            .await?
            .pop()
            .ok_or(MovieStoreError::MovieNotFound(movie_id))?;
        txn.commit().await?;
        debug!(movie_id = created.movie.id, "Created movie");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: i32,
        changes: MovieChanges,
    ) -> Result<MovieWithRelations, MovieStoreError> {
        let txn = self.db.orm.begin().await?;

        let existing = Movies::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(MovieStoreError::MovieNotFound(id))?;

        if let Some(director_id) = changes.director_id {
            ensure_director(&txn, director_id).await?;
        }
        let genre_ids = match changes.genre_ids {
            | Some(ref ids) => Some(ensure_genres(&txn, ids).await?),
            | None => None,
        };

        if let Some(detail) = changes.detail {
            let row = MovieDetails::find_by_id(existing.detail_id)
                .one(&txn)
                .await?;
            if let Some(row) = row {
                let mut row: movie_details::ActiveModel = row.into();
                row.detail = Set(detail);
                row.update(&txn).await?;
            }
        }

        let mut model: movies::ActiveModel = existing.into();
        if let Some(ref title) = changes.title {
            ensure_unique_title(&txn, title, Some(id)).await?;
            model.title = Set(title.clone());
        }
        if let Some(director_id) = changes.director_id {
            model.director_id = Set(director_id);
        }
        model.updated_at = Set(Utc::now());
        let movie = model.update(&txn).await.map_err(|e| {
            map_unique_title(e, changes.title.as_deref().unwrap_or_default())
        })?;

        if let Some(wanted) = genre_ids {
            let current: BTreeSet<i32> =
                GenreLinks::genre_ids(&txn, id).await?.into_iter().collect();
            let to_add: Vec<i32> =
                wanted.difference(&current).copied().collect();
            let to_remove: Vec<i32> =
                current.difference(&wanted).copied().collect();
            GenreLinks::add(&txn, id, &to_add).await?;
            GenreLinks::remove(&txn, id, &to_remove).await?;
        }

        let updated = with_relations(&txn, vec![movie])
            .await?
            .pop()
            .ok_or(MovieStoreError::MovieNotFound(id))?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Removes the movie along with its reactions, genre links and detail.
    pub async fn delete(&self, id: i32) -> Result<(), MovieStoreError> {
        let txn = self.db.orm.begin().await?;

        let movie = Movies::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(MovieStoreError::MovieNotFound(id))?;

        MovieUserLikes::delete_many()
            .filter(movie_user_likes::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;
        let genre_ids = GenreLinks::genre_ids(&txn, id).await?;
        GenreLinks::remove(&txn, id, &genre_ids).await?;
        Movies::delete_by_id(id).exec(&txn).await?;
        MovieDetails::delete_by_id(movie.detail_id).exec(&txn).await?;

        txn.commit().await?;
        Ok(())
    }
}

/// Explicit management of the `movie_genres` join table.
struct GenreLinks;

impl GenreLinks {
    async fn genre_ids<C: ConnectionTrait>(
        conn: &C,
        movie_id: i32,
    ) -> Result<Vec<i32>, DbErr> {
        let rows = MovieGenres::find()
            .filter(movie_genres::Column::MovieId.eq(movie_id))
            .all(conn)
            .await?;
        Ok(rows.into_iter().map(|r| r.genre_id).collect())
    }

    async fn add<C: ConnectionTrait>(
        conn: &C,
        movie_id: i32,
        genre_ids: &[i32],
    ) -> Result<(), DbErr> {
        if genre_ids.is_empty() {
            return Ok(());
        }
        let links = genre_ids.iter().map(|genre_id| {
            movie_genres::ActiveModel {
                movie_id: Set(movie_id),
                genre_id: Set(*genre_id),
            }
        });
        MovieGenres::insert_many(links)
            .exec_without_returning(conn)
            .await?;
        Ok(())
    }

    async fn remove<C: ConnectionTrait>(
        conn: &C,
        movie_id: i32,
        genre_ids: &[i32],
    ) -> Result<(), DbErr> {
        if genre_ids.is_empty() {
            return Ok(());
        }
        MovieGenres::delete_many()
            .filter(movie_genres::Column::MovieId.eq(movie_id))
            .filter(movie_genres::Column::GenreId.is_in(genre_ids.to_vec()))
            .exec(conn)
            .await?;
        Ok(())
    }
}

async fn with_relations<C: ConnectionTrait>(
    conn: &C,
    movies: Vec<Movie>,
) -> Result<Vec<MovieWithRelations>, MovieStoreError> {
    if movies.is_empty() {
        return Ok(Vec::new());
    }
    let details = movies.load_one(MovieDetails, conn).await?;
    let directors = movies.load_one(Directors, conn).await?;
    let genres = movies.load_many_to_many(Genres, MovieGenres, conn).await?;

    Ok(movies
        .into_iter()
        .zip(details)
        .zip(directors)
        .zip(genres)
        .map(|(((movie, detail), director), mut genres)| {
            genres.sort_by_key(|g| g.id);
            MovieWithRelations {
                movie,
                detail,
                director,
                genres,
            }
        })
        .collect())
}

async fn ensure_director<C: ConnectionTrait>(
    conn: &C,
    director_id: i32,
) -> Result<(), MovieStoreError> {
    Directors::find_by_id(director_id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or(MovieStoreError::DirectorNotFound(director_id))
}

/// Every requested genre must exist. Returns the de-duplicated ids.
async fn ensure_genres<C: ConnectionTrait>(
    conn: &C,
    genre_ids: &[i32],
) -> Result<BTreeSet<i32>, MovieStoreError> {
    let wanted: BTreeSet<i32> = genre_ids.iter().copied().collect();
    let found: BTreeSet<i32> = Genres::find()
        .filter(crate::db_model::genres::Column::Id.is_in(wanted.iter().copied()))
        .all(conn)
        .await?
        .into_iter()
        .map(|g| g.id)
        .collect();
    if found != wanted {
        return Err(MovieStoreError::GenresNotFound {
            found: found.into_iter().collect(),
        });
    }
    Ok(wanted)
}

async fn ensure_unique_title<C: ConnectionTrait>(
    conn: &C,
    title: &str,
    except: Option<i32>,
) -> Result<(), MovieStoreError> {
    let mut query = Movies::find().filter(movies::Column::Title.eq(title));
    if let Some(id) = except {
        query = query.filter(movies::Column::Id.ne(id));
    }
    if query.one(conn).await?.is_some() {
        return Err(MovieStoreError::DuplicateTitle(title.to_owned()));
    }
    Ok(())
}

fn map_unique_title(err: DbErr, title: &str) -> MovieStoreError {
    match err.sql_err() {
        | Some(SqlErr::UniqueConstraintViolation(_)) => {
            MovieStoreError::DuplicateTitle(title.to_owned())
        }
        | _ => err.into(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db_model::users::Role;
    use crate::director_store::DirectorStore;
    use crate::genre_store::GenreStore;
    use crate::user_store::UserStore;

    pub(crate) struct Fixture {
        pub db: Database,
        pub store: MovieStore,
        pub admin_id: i32,
        pub director_id: i32,
        pub genre_ids: Vec<i32>,
    }

    pub(crate) async fn fixture() -> anyhow::Result<Fixture> {
        let db = Database::in_memory().await?;
        let admin = UserStore::new(db.clone())
            .create("admin@example.com".into(), "hash".into(), Role::Admin)
            .await?;
        let director = DirectorStore::new(db.clone())
            .create(
                "Bong Joon-ho".into(),
                NaiveDate::from_ymd_opt(1969, 9, 14).unwrap(),
                "KR".into(),
            )
            .await?;
        let genres = GenreStore::new(db.clone());
        let drama = genres.create("drama".into()).await?;
        let thriller = genres.create("thriller".into()).await?;
        Ok(Fixture {
            store: MovieStore::new(db.clone()),
            db,
            admin_id: admin.id,
            director_id: director.id,
            genre_ids: vec![drama.id, thriller.id],
        })
    }

    pub(crate) fn new_movie(f: &Fixture, title: &str) -> NewMovie {
        NewMovie {
            title: title.to_owned(),
            detail: format!("{title} detail"),
            director_id: f.director_id,
            genre_ids: f.genre_ids.clone(),
            movie_file_name: format!("{title}.mp4"),
        }
    }

    #[tokio::test]
    async fn create_and_get() -> anyhow::Result<()> {
        let f = fixture().await?;
        let created = f.store.create(new_movie(&f, "Parasite"), f.admin_id).await?;

        assert_eq!("Parasite", created.movie.title);
        assert_eq!("public/movie/Parasite.mp4", created.movie.movie_file_path);
        assert_eq!(Some(f.admin_id), created.movie.creator_id);
        assert_eq!(
            Some("Parasite detail"),
            created.detail.as_ref().map(|d| d.detail.as_str())
        );
        assert_eq!(Some(f.director_id), created.director.as_ref().map(|d| d.id));
        assert_eq!(
            f.genre_ids,
            created.genres.iter().map(|g| g.id).collect::<Vec<_>>()
        );

        assert_eq!(Some(created.clone()), f.store.get(created.movie.id).await?);
        assert_eq!(None, f.store.get(12345).await?);
        Ok(())
    }

    #[tokio::test]
    async fn create_is_atomic() -> anyhow::Result<()> {
        let f = fixture().await?;

        let mut bad_genre = new_movie(&f, "Mother");
        bad_genre.genre_ids.push(999);
        let err = f.store.create(bad_genre, f.admin_id).await.unwrap_err();
        assert!(matches!(
            err,
            MovieStoreError::GenresNotFound { ref found } if *found == f.genre_ids
        ));

        let mut bad_director = new_movie(&f, "Mother");
        bad_director.director_id = 999;
        assert!(matches!(
            f.store.create(bad_director, f.admin_id).await,
            Err(MovieStoreError::DirectorNotFound(999))
        ));

        f.store.create(new_movie(&f, "Mother"), f.admin_id).await?;
        assert!(matches!(
            f.store.create(new_movie(&f, "Mother"), f.admin_id).await,
            Err(MovieStoreError::DuplicateTitle(_))
        ));

        // Nothing from the failed attempts was left behind.
        assert_eq!(1, MovieDetails::find().count(&f.db.orm).await?);
        assert_eq!(1, Movies::find().count(&f.db.orm).await?);
        Ok(())
    }

    #[tokio::test]
    async fn update_replaces_genre_links() -> anyhow::Result<()> {
        let f = fixture().await?;
        let created = f.store.create(new_movie(&f, "Okja"), f.admin_id).await?;
        let comedy = GenreStore::new(f.db.clone()).create("comedy".into()).await?;

        let updated = f
            .store
            .update(
                created.movie.id,
                MovieChanges {
                    title: Some("Okja (2017)".into()),
                    detail: Some("a super pig".into()),
                    genre_ids: Some(vec![f.genre_ids[0], comedy.id]),
                    ..Default::default()
                },
            )
            .await?;

        assert_eq!("Okja (2017)", updated.movie.title);
        assert_eq!(
            Some("a super pig"),
            updated.detail.as_ref().map(|d| d.detail.as_str())
        );
        let mut genre_ids: Vec<i32> = updated.genres.iter().map(|g| g.id).collect();
        genre_ids.sort();
        assert_eq!(vec![f.genre_ids[0], comedy.id], genre_ids);

        assert!(matches!(
            f.store
                .update(
                    created.movie.id,
                    MovieChanges {
                        director_id: Some(999),
                        ..Default::default()
                    }
                )
                .await,
            Err(MovieStoreError::DirectorNotFound(999))
        ));
        assert!(matches!(
            f.store.update(999, MovieChanges::default()).await,
            Err(MovieStoreError::MovieNotFound(999))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_everything() -> anyhow::Result<()> {
        let f = fixture().await?;
        let created = f.store.create(new_movie(&f, "Memories"), f.admin_id).await?;

        f.store.delete(created.movie.id).await?;
        assert_eq!(None, f.store.get(created.movie.id).await?);
        assert_eq!(0, MovieDetails::find().count(&f.db.orm).await?);
        assert_eq!(0, MovieGenres::find().count(&f.db.orm).await?);
        assert!(matches!(
            f.store.delete(created.movie.id).await,
            Err(MovieStoreError::MovieNotFound(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn list_filters_and_paginates() -> anyhow::Result<()> {
        let f = fixture().await?;
        for i in 1..=15 {
            f.store
                .create(new_movie(&f, &format!("movie {i:02}")), f.admin_id)
                .await?;
        }
        f.store.create(new_movie(&f, "other"), f.admin_id).await?;

        let page = PageQuery::resolve::<&str>(None, None, 5)?;
        let result = f.store.list(Some("movie"), &page).await?;
        assert_eq!(15, result.count);
        assert_eq!(
            vec!["movie 15", "movie 14", "movie 13", "movie 12", "movie 11"],
            result
                .page
                .data
                .iter()
                .map(|m| m.movie.title.as_str())
                .collect::<Vec<_>>()
        );
        assert!(result.page.data.iter().all(|m| m.genres.len() == 2));

        let next = PageQuery::resolve::<&str>(
            result.page.next_cursor.as_deref(),
            None,
            5,
        )?;
        let result = f.store.list(Some("movie"), &next).await?;
        assert_eq!(15, result.count);
        assert_eq!(5, result.page.data.len());
        assert_eq!("movie 10", result.page.data[0].movie.title);

        let recent = f.store.recent(3).await?;
        assert_eq!(
            vec!["other", "movie 15", "movie 14"],
            recent.iter().map(|m| m.movie.title.as_str()).collect::<Vec<_>>()
        );
        Ok(())
    }
}
