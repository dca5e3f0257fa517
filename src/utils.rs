use chrono::{NaiveDateTime, SecondsFormat};
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::content::RawJson;
use rocket::response::{self, Responder, Response};
use serde::Serializer;
use serde_json::Value;

pub fn try_respond<'r, 'o: 'r>(
    req: &'r Request<'_>,
    json: &Value,
    status: Status,
) -> response::Result<'o> {
    let as_json = serde_json::to_string(json);
    match as_json {
        Ok(json) => {
            let resp = RawJson(json).respond_to(req)?;
            Response::build_from(resp).status(status).ok()
        }

        Err(_) => Err(Status::InternalServerError),
    }
}

/// Timestamps are stored without a zone and are always UTC.
pub fn serialize_date<S>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = date.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true);
    serializer.serialize_str(&s)
}
