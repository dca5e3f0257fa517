use diesel::prelude::*;
use rocket::serde::json::Json;
use serde::Serialize;

use crate::db::schema::topics;
use crate::db::{Db, Store};
use crate::types::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Selectable)]
#[diesel(table_name = topics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Topic {
    pub slug: String,
    pub description: String,
}

impl Topic {
    pub fn select_all(store: &dyn Store) -> Result<Vec<Topic>, ApiError> {
        store.topics()
    }
}

#[derive(Debug, Serialize)]
pub struct TopicsResponse {
    topics: Vec<Topic>,
}

#[get("/topics")]
pub async fn list(db: Db) -> ApiResult<TopicsResponse> {
    let topics = db.run(|store| Topic::select_all(store)).await?;
    Ok(Json(TopicsResponse { topics }))
}
