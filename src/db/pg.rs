use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Nullable, Text};
use diesel::{delete, insert_into, select, sql_query};

use super::schema::{articles, comments, topics, users};
use super::{DbConnection, Pool, Store, StoreResult};
use crate::article::{Article, ArticleQuery, SELECT_ARTICLE_BY_ID, UPDATE_VOTES};
use crate::comment::{Comment, NewComment};
use crate::topic::Topic;
use crate::users::models::User;

/// `Store` backed by Postgres. Every call checks out its own pooled
/// connection.
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> PgStore {
        PgStore { pool }
    }

    fn connection(&self) -> StoreResult<DbConnection> {
        Ok(DbConnection(self.pool.get()?))
    }
}

impl Store for PgStore {
    fn topics(&self) -> StoreResult<Vec<Topic>> {
        let mut conn = self.connection()?;
        let topics = topics::table
            .select(Topic::as_select())
            .load::<Topic>(&mut *conn)?;
        Ok(topics)
    }

    fn topic_exists(&self, slug: &str) -> StoreResult<bool> {
        let mut conn = self.connection()?;
        let found = select(exists(topics::table.find(slug))).get_result::<bool>(&mut *conn)?;
        Ok(found)
    }

    fn articles(&self, query: &ArticleQuery) -> StoreResult<Vec<Article>> {
        let mut conn = self.connection()?;
        let sql = query.to_sql();
        tracing::debug!(%sql, "listing articles");
        let articles = match query.topic() {
            Some(topic) => sql_query(sql)
                .bind::<Text, _>(topic.to_owned())
                .load::<Article>(&mut *conn)?,
            None => sql_query(sql).load::<Article>(&mut *conn)?,
        };
        Ok(articles)
    }

    fn article(&self, article_id: i32) -> StoreResult<Option<Article>> {
        let mut conn = self.connection()?;
        let article = sql_query(SELECT_ARTICLE_BY_ID)
            .bind::<Integer, _>(article_id)
            .get_result::<Article>(&mut *conn)
            .optional()?;
        Ok(article)
    }

    fn article_exists(&self, article_id: i32) -> StoreResult<bool> {
        let mut conn = self.connection()?;
        let found =
            select(exists(articles::table.find(article_id))).get_result::<bool>(&mut *conn)?;
        Ok(found)
    }

    fn add_votes(&self, article_id: i32, inc_votes: Option<i32>) -> StoreResult<Option<Article>> {
        let mut conn = self.connection()?;
        let article = sql_query(UPDATE_VOTES)
            .bind::<Nullable<Integer>, _>(inc_votes)
            .bind::<Integer, _>(article_id)
            .get_result::<Article>(&mut *conn)
            .optional()?;
        Ok(article)
    }

    fn comments(&self, article_id: i32) -> StoreResult<Vec<Comment>> {
        let mut conn = self.connection()?;
        let comments = comments::table
            .filter(comments::article_id.eq(article_id))
            .order((comments::created_at.desc(), comments::comment_id.desc()))
            .select(Comment::as_select())
            .load::<Comment>(&mut *conn)?;
        Ok(comments)
    }

    fn insert_comment(&self, comment: &NewComment) -> StoreResult<Comment> {
        let mut conn = self.connection()?;
        let comment = insert_into(comments::table)
            .values(comment)
            .returning(Comment::as_returning())
            .get_result::<Comment>(&mut *conn)?;
        Ok(comment)
    }

    fn delete_comment(&self, comment_id: i32) -> StoreResult<usize> {
        let mut conn = self.connection()?;
        let deleted = delete(comments::table.find(comment_id)).execute(&mut *conn)?;
        Ok(deleted)
    }

    fn users(&self) -> StoreResult<Vec<User>> {
        let mut conn = self.connection()?;
        let users = users::table
            .select(User::as_select())
            .load::<User>(&mut *conn)?;
        Ok(users)
    }
}
