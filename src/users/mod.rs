use rocket::serde::json::Json;
use serde::Serialize;

use crate::db::{Db, Store};
use crate::types::{ApiError, ApiResult};

pub mod models;

use self::models::User;

impl User {
    pub fn select_all(store: &dyn Store) -> Result<Vec<User>, ApiError> {
        store.users()
    }
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    users: Vec<User>,
}

#[get("/users")]
pub async fn list(db: Db) -> ApiResult<UsersResponse> {
    let users = db.run(|store| User::select_all(store)).await?;
    Ok(Json(UsersResponse { users }))
}
