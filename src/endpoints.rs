use lazy_static::lazy_static;
use rocket::serde::json::Json;
use serde_json::{json, Value};

lazy_static! {
    static ref ENDPOINTS: Value = {
        let document = include_str!("../endpoints.json");
        serde_json::from_str(document).unwrap()
    };
}

#[get("/")]
pub fn index() -> Json<Value> {
    Json(json!({ "endpoints": ENDPOINTS.clone() }))
}
