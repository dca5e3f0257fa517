use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::sql_types::{BigInt, Integer, Text, Timestamp};
use diesel::QueryableByName;
use rocket::serde::json::{self, Json};
use serde::{Deserialize, Serialize};

use crate::db::{Db, Store};
use crate::types::{json_body, parse_id, ApiError, ApiResult, RawId};
use crate::utils::serialize_date;

static SELECT_ARTICLES: &str = "SELECT articles.article_id AS article_id,
       articles.title AS title,
       articles.topic AS topic,
       articles.author AS author,
       articles.body AS body,
       articles.created_at AS created_at,
       articles.votes AS votes,
       COUNT(comments.comment_id) AS comment_count
  FROM articles
       LEFT JOIN comments ON articles.article_id = comments.article_id";

pub static SELECT_ARTICLE_BY_ID: &str = "SELECT articles.article_id AS article_id,
       articles.title AS title,
       articles.topic AS topic,
       articles.author AS author,
       articles.body AS body,
       articles.created_at AS created_at,
       articles.votes AS votes,
       COUNT(comments.comment_id) AS comment_count
  FROM articles
       LEFT JOIN comments ON articles.article_id = comments.article_id
 WHERE articles.article_id = $1
 GROUP BY articles.article_id";

// The increment and the read of the new value happen in one statement.
pub static UPDATE_VOTES: &str = "WITH updated AS (
    UPDATE articles
       SET votes = votes + $1
     WHERE article_id = $2
 RETURNING *
)
SELECT updated.article_id AS article_id,
       updated.title AS title,
       updated.topic AS topic,
       updated.author AS author,
       updated.body AS body,
       updated.created_at AS created_at,
       updated.votes AS votes,
       (SELECT COUNT(*) FROM comments WHERE comments.article_id = updated.article_id) AS comment_count
  FROM updated";

#[derive(Debug, Clone, PartialEq, Serialize, QueryableByName)]
pub struct Article {
    #[diesel(sql_type = Integer)]
    pub article_id: i32,
    #[diesel(sql_type = Text)]
    pub title: String,
    #[diesel(sql_type = Text)]
    pub topic: String,
    #[diesel(sql_type = Text)]
    pub author: String,
    #[diesel(sql_type = Text)]
    pub body: String,
    #[diesel(sql_type = Timestamp)]
    #[serde(serialize_with = "serialize_date")]
    pub created_at: NaiveDateTime,
    #[diesel(sql_type = Integer)]
    pub votes: i32,
    #[diesel(sql_type = BigInt)]
    pub comment_count: i64,
}

/// Columns an article listing may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    Author,
    Title,
    ArticleId,
    Topic,
    #[default]
    CreatedAt,
    Votes,
    CommentCount,
}

impl SortBy {
    pub fn column(self) -> &'static str {
        match self {
            SortBy::Author => "articles.author",
            SortBy::Title => "articles.title",
            SortBy::ArticleId => "articles.article_id",
            SortBy::Topic => "articles.topic",
            SortBy::CreatedAt => "articles.created_at",
            SortBy::Votes => "articles.votes",
            SortBy::CommentCount => "comment_count",
        }
    }
}

impl FromStr for SortBy {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<SortBy, ApiError> {
        match s {
            "author" => Ok(SortBy::Author),
            "title" => Ok(SortBy::Title),
            "article_id" => Ok(SortBy::ArticleId),
            "topic" => Ok(SortBy::Topic),
            "created_at" => Ok(SortBy::CreatedAt),
            "votes" => Ok(SortBy::Votes),
            "comment_count" => Ok(SortBy::CommentCount),
            _ => Err(ApiError::bad_request()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

impl Order {
    pub fn keyword(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

impl FromStr for Order {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Order, ApiError> {
        match s {
            "ASC" => Ok(Order::Asc),
            "DESC" => Ok(Order::Desc),
            _ => Err(ApiError::bad_request()),
        }
    }
}

/// A validated article listing request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArticleQuery {
    topic: Option<String>,
    sort_by: SortBy,
    order: Order,
}

impl ArticleQuery {
    /// Checks `sort_by` then `order` against their allow-lists. An empty
    /// `topic` means no filter.
    pub fn parse(
        topic: Option<&str>,
        sort_by: Option<&str>,
        order: Option<&str>,
    ) -> Result<ArticleQuery, ApiError> {
        let sort_by = match sort_by {
            Some(s) => s.parse()?,
            None => SortBy::default(),
        };
        let order = match order {
            Some(o) => o.parse()?,
            None => Order::default(),
        };
        let topic = topic.filter(|t| !t.is_empty()).map(str::to_owned);
        Ok(ArticleQuery {
            topic,
            sort_by,
            order,
        })
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    pub fn order(&self) -> Order {
        self.order
    }

    /// The listing statement. The topic, when present, is bound as `$1`;
    /// only allow-listed identifiers are interpolated.
    pub fn to_sql(&self) -> String {
        let mut sql = String::from(SELECT_ARTICLES);
        if self.topic.is_some() {
            sql.push_str("\n WHERE articles.topic = $1");
        }
        let order = self.order.keyword();
        sql.push_str(&format!(
            "\n GROUP BY articles.article_id\n ORDER BY {} {}, articles.article_id {}",
            self.sort_by.column(),
            order,
            order
        ));
        sql
    }
}

impl Article {
    pub fn select_all(
        store: &dyn Store,
        topic: Option<&str>,
        sort_by: Option<&str>,
        order: Option<&str>,
    ) -> Result<Vec<Article>, ApiError> {
        let query = ArticleQuery::parse(topic, sort_by, order)?;
        if let Some(topic) = query.topic() {
            if !store.topic_exists(topic)? {
                return Err(ApiError::not_found());
            }
        }
        store.articles(&query)
    }

    pub fn load_by_id(store: &dyn Store, article_id: i32) -> Result<Article, ApiError> {
        store.article(article_id)?.ok_or_else(ApiError::not_found)
    }

    pub fn add_votes(
        store: &dyn Store,
        article_id: i32,
        inc_votes: Option<i32>,
    ) -> Result<Article, ApiError> {
        store
            .add_votes(article_id, inc_votes)?
            .ok_or_else(ApiError::not_found)
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    article: Article,
}

#[derive(Debug, Serialize)]
pub struct ArticlesResponse {
    articles: Vec<Article>,
}

/// A missing `inc_votes` is passed through as NULL and rejected by the
/// database.
#[derive(Debug, Default, Deserialize)]
pub struct VoteUpdate {
    inc_votes: Option<i32>,
}

#[get("/articles?<topic>&<sort_by>&<order>")]
pub async fn list(
    db: Db,
    topic: Option<&str>,
    sort_by: Option<&str>,
    order: Option<&str>,
) -> ApiResult<ArticlesResponse> {
    let topic = topic.map(str::to_owned);
    let sort_by = sort_by.map(str::to_owned);
    let order = order.map(str::to_owned);
    let articles = db
        .run(move |store| {
            Article::select_all(store, topic.as_deref(), sort_by.as_deref(), order.as_deref())
        })
        .await?;
    Ok(Json(ArticlesResponse { articles }))
}

#[get("/articles/<article_id>")]
pub async fn get(db: Db, article_id: RawId<'_>) -> ApiResult<ArticleResponse> {
    let article_id = parse_id(article_id)?;
    let article = db
        .run(move |store| Article::load_by_id(store, article_id))
        .await?;
    Ok(Json(ArticleResponse { article }))
}

#[patch("/articles/<article_id>", data = "<update>")]
pub async fn update_votes(
    db: Db,
    article_id: RawId<'_>,
    update: Result<Json<VoteUpdate>, json::Error<'_>>,
) -> ApiResult<ArticleResponse> {
    let article_id = parse_id(article_id)?;
    let update: VoteUpdate = json_body(update)?;
    let article = db
        .run(move |store| Article::add_votes(store, article_id, update.inc_votes))
        .await?;
    Ok(Json(ArticleResponse { article }))
}
