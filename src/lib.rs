#[macro_use]
extern crate rocket;

pub mod article;
pub mod comment;
pub mod db;
pub mod endpoints;
pub mod topic;
pub mod types;
pub mod users;
mod utils;

use rocket::http::Status;
use rocket::request::Request;
use rocket::serde::json::Json;
use rocket::{Build, Rocket};
use serde_json::{json, Value};

use crate::db::{Board, Store};

#[catch(404)]
fn not_found(_req: &Request<'_>) -> Json<Value> {
    Json(json!({ "msg": "invalid URL" }))
}

#[catch(default)]
fn default_catcher(status: Status, req: &Request<'_>) -> Json<Value> {
    let msg = if status.code >= 500 {
        tracing::error!(status = status.code, uri = %req.uri(), "request failed");
        types::SERVER_ERROR
    } else {
        status.reason().unwrap_or(types::BAD_REQUEST)
    };
    Json(json!({ "msg": msg }))
}

/// Builds the application around `store`.
pub fn rocket<S: Store + 'static>(store: S) -> Rocket<Build> {
    rocket::build()
        .manage(Board::new(store))
        .mount(
            "/api",
            routes![
                endpoints::index,
                topic::list,
                article::list,
                article::get,
                article::update_votes,
                comment::list,
                comment::add,
                comment::delete,
                users::list,
            ],
        )
        .register("/", catchers![not_found, default_catcher])
}
