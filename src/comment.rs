use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::{self, Json};
use serde::{Deserialize, Serialize};

use crate::db::schema::comments;
use crate::db::{Db, Store};
use crate::types::{json_body, parse_id, ApiError, ApiResult, RawId, Validate};
use crate::utils::serialize_date;

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Selectable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Comment {
    pub comment_id: i32,
    pub article_id: i32,
    pub author: String,
    pub body: String,
    pub votes: i32,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: NaiveDateTime,
}

/// A comment as submitted. Absent fields insert as DEFAULT, which the
/// not-null constraints on `author` and `body` reject.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub article_id: i32,
    pub author: Option<String>,
    pub body: Option<String>,
}

impl Validate for NewComment {
    type Error = ApiError;
    fn validate(self) -> Result<Self, ApiError> {
        let empty = |field: &Option<String>| field.as_deref() == Some("");
        if empty(&self.author) || empty(&self.body) {
            Err(ApiError::bad_request())
        } else {
            Ok(self)
        }
    }
}

impl Comment {
    pub fn for_article(store: &dyn Store, article_id: i32) -> Result<Vec<Comment>, ApiError> {
        if !store.article_exists(article_id)? {
            return Err(ApiError::not_found());
        }
        store.comments(article_id)
    }

    pub fn insert(store: &dyn Store, comment: NewComment) -> Result<Comment, ApiError> {
        let comment = comment.validate()?;
        let created = store.insert_comment(&comment)?;
        tracing::info!(
            comment_id = created.comment_id,
            article_id = created.article_id,
            "comment posted"
        );
        Ok(created)
    }

    pub fn delete(store: &dyn Store, comment_id: i32) -> Result<(), ApiError> {
        match store.delete_comment(comment_id)? {
            0 => Err(ApiError::not_found()),
            _ => {
                tracing::info!(comment_id, "comment deleted");
                Ok(())
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentBody {
    username: Option<String>,
    body: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommentContainer<T> {
    comment: T,
}

#[derive(Debug, Serialize)]
pub struct CommentsContainer<T> {
    comments: T,
}

#[get("/articles/<article_id>/comments")]
pub async fn list(db: Db, article_id: RawId<'_>) -> ApiResult<CommentsContainer<Vec<Comment>>> {
    let article_id = parse_id(article_id)?;
    let comments = db
        .run(move |store| Comment::for_article(store, article_id))
        .await?;
    Ok(Json(CommentsContainer { comments }))
}

#[post("/articles/<article_id>/comments", data = "<details>")]
pub async fn add(
    db: Db,
    article_id: RawId<'_>,
    details: Result<Json<CommentBody>, json::Error<'_>>,
) -> Result<status::Custom<Json<CommentContainer<Comment>>>, ApiError> {
    let article_id = parse_id(article_id)?;
    let details: CommentBody = json_body(details)?;
    let new_comment = NewComment {
        article_id,
        author: details.username,
        body: details.body,
    };
    let comment = db
        .run(move |store| Comment::insert(store, new_comment))
        .await?;
    Ok(status::Custom(Status::Created, Json(CommentContainer { comment })))
}

#[delete("/comments/<comment_id>")]
pub async fn delete(db: Db, comment_id: RawId<'_>) -> Result<status::NoContent, ApiError> {
    let comment_id = parse_id(comment_id)?;
    db.run(move |store| Comment::delete(store, comment_id))
        .await?;
    Ok(status::NoContent)
}
