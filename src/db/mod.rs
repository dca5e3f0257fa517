use diesel::pg::PgConnection;
use diesel::r2d2::ConnectionManager;
use diesel::result::Error as DieselError;
use error_chain::error_chain;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use rocket::tokio::task;
use std::env;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::article::{Article, ArticleQuery};
use crate::comment::{Comment, NewComment};
use crate::topic::Topic;
use crate::types::ApiError;
use crate::users::models::User;

mod pg;
pub mod schema;

pub use self::pg::PgStore;

const DEFAULT_POOL_SIZE: u32 = 10;

// An alias to the type for a pool of Diesel Postgres connections.
pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub struct DbConnection(pub r2d2::PooledConnection<ConnectionManager<PgConnection>>);

error_chain! {
    foreign_links {
        Var(::std::env::VarError);
        PoolSize(::std::num::ParseIntError);
        R2D2(r2d2::Error);
        Diesel(DieselError);
    }
}

// For the convenience of using a DbConnection as a PgConnection.
impl Deref for DbConnection {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DbConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Builds the connection pool from `DATABASE_URL` and the optional
/// `DATABASE_POOL_SIZE`.
pub fn init_pool() -> Result<Pool> {
    let database_url = env::var("DATABASE_URL")?;
    let pool_size = match env::var("DATABASE_POOL_SIZE") {
        Ok(size) => size.parse::<u32>()?,
        Err(_) => DEFAULT_POOL_SIZE,
    };
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Ok(Pool::builder().max_size(pool_size).build(manager)?)
}

pub type StoreResult<T> = ::std::result::Result<T, ApiError>;

/// Database access used by the query layer. Each method is a single
/// autocommit statement.
pub trait Store: Send + Sync {
    fn topics(&self) -> StoreResult<Vec<Topic>>;

    fn topic_exists(&self, slug: &str) -> StoreResult<bool>;

    fn articles(&self, query: &ArticleQuery) -> StoreResult<Vec<Article>>;

    fn article(&self, article_id: i32) -> StoreResult<Option<Article>>;

    fn article_exists(&self, article_id: i32) -> StoreResult<bool>;

    /// Adds `inc_votes` to the stored count in one statement. `None` if no
    /// article has that id.
    fn add_votes(&self, article_id: i32, inc_votes: Option<i32>) -> StoreResult<Option<Article>>;

    fn comments(&self, article_id: i32) -> StoreResult<Vec<Comment>>;

    fn insert_comment(&self, comment: &NewComment) -> StoreResult<Comment>;

    /// Returns the number of rows removed.
    fn delete_comment(&self, comment_id: i32) -> StoreResult<usize>;

    fn users(&self) -> StoreResult<Vec<User>>;
}

/// The store managed by Rocket.
pub struct Board(Arc<dyn Store>);

impl Board {
    pub fn new<S: Store + 'static>(store: S) -> Board {
        Board(Arc::new(store))
    }
}

/// Request guard handing the managed store to a handler.
pub struct Db(Arc<dyn Store>);

/// Retrieves the managed store. If none is managed, fails with an
/// `InternalServerError` status.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for Db {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Db, ()> {
        match request.rocket().state::<Board>() {
            Some(board) => Outcome::Success(Db(Arc::clone(&board.0))),
            None => Outcome::Error((Status::InternalServerError, ())),
        }
    }
}

impl Db {
    /// Runs `f` on the blocking thread pool so a slow query only holds up
    /// the request waiting on it.
    pub async fn run<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&dyn Store) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.0);
        task::spawn_blocking(move || f(&*store))
            .await
            .map_err(|err| ApiError::Unknown(format!("store task failed: {}", err)))?
    }
}
