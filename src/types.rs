use std::borrow::Cow;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::{self, Json};
use serde_json::json;

use crate::utils::try_respond;

pub const BAD_REQUEST: &str = "bad request";
pub const NOT_FOUND: &str = "not found";
pub const INVALID_INPUT: &str = "invalid id / input";
pub const PROPERTY_MISSING: &str = "property missing or invalid";
pub const SERVER_ERROR: &str = "server error!";

pub trait Validate
where
    Self: Sized,
{
    type Error;
    fn validate(self) -> Result<Self, Self::Error>;
}

/// Constraint violations reported by the database type and integrity layer,
/// named after their Postgres SQLSTATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// 22P02: a value could not be parsed as the column's type.
    InvalidTextRepresentation,
    /// 23503: a write referenced a parent row that does not exist.
    ForeignKeyViolation,
    /// 23502: a required column was NULL.
    NotNullViolation,
}

impl Constraint {
    pub fn code(self) -> &'static str {
        match self {
            Constraint::InvalidTextRepresentation => "22P02",
            Constraint::ForeignKeyViolation => "23503",
            Constraint::NotNullViolation => "23502",
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// A failure the query layer raised itself, rendered verbatim.
    Explicit { status: Status, msg: Cow<'static, str> },
    Constraint(Constraint),
    Unknown(String),
}

impl ApiError {
    pub fn explicit<M: Into<Cow<'static, str>>>(status: Status, msg: M) -> ApiError {
        ApiError::Explicit {
            status,
            msg: msg.into(),
        }
    }

    pub fn bad_request() -> ApiError {
        ApiError::explicit(Status::BadRequest, BAD_REQUEST)
    }

    pub fn not_found() -> ApiError {
        ApiError::explicit(Status::NotFound, NOT_FOUND)
    }

    pub fn invalid_input() -> ApiError {
        ApiError::Constraint(Constraint::InvalidTextRepresentation)
    }

    /// The status and message this error is rendered as.
    pub fn translate(&self) -> (Status, &str) {
        match self {
            ApiError::Explicit { status, msg } => (*status, msg.as_ref()),
            ApiError::Constraint(Constraint::InvalidTextRepresentation) => {
                (Status::BadRequest, INVALID_INPUT)
            }
            ApiError::Constraint(Constraint::ForeignKeyViolation) => (Status::NotFound, NOT_FOUND),
            ApiError::Constraint(Constraint::NotNullViolation) => {
                (Status::BadRequest, PROPERTY_MISSING)
            }
            ApiError::Unknown(_) => (Status::InternalServerError, SERVER_ERROR),
        }
    }
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> ApiError {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, ref info) => {
                tracing::debug!(detail = info.message(), "foreign key violation");
                ApiError::Constraint(Constraint::ForeignKeyViolation)
            }
            DieselError::DatabaseError(DatabaseErrorKind::NotNullViolation, ref info) => {
                tracing::debug!(detail = info.message(), "not null violation");
                ApiError::Constraint(Constraint::NotNullViolation)
            }
            other => ApiError::Unknown(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for ApiError {
    fn from(err: r2d2::Error) -> ApiError {
        ApiError::Unknown(format!("connection pool: {}", err))
    }
}

impl<'a> From<json::Error<'a>> for ApiError {
    fn from(err: json::Error<'a>) -> ApiError {
        tracing::debug!(error = ?err, "rejected request body");
        ApiError::invalid_input()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Unwraps a JSON request body. An empty body reads as `{}`, leaving every
/// field absent.
pub fn json_body<T: Default>(body: Result<Json<T>, json::Error<'_>>) -> Result<T, ApiError> {
    match body {
        Ok(json) => Ok(json.into_inner()),
        Err(json::Error::Parse(raw, _)) if raw.trim().is_empty() => Ok(T::default()),
        Err(err) => Err(err.into()),
    }
}

/// Path segment that should hold an integer id. Kept as a `Result` so a
/// malformed id reaches the handler instead of falling through to the 404
/// catcher.
pub type RawId<'a> = Result<i32, &'a str>;

pub fn parse_id(raw: RawId<'_>) -> Result<i32, ApiError> {
    raw.map_err(|segment| {
        tracing::debug!(segment, "malformed id");
        ApiError::invalid_input()
    })
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        match &self {
            ApiError::Explicit { status, msg } => {
                tracing::debug!(
                    status = status.code,
                    msg = %msg,
                    uri = %req.uri(),
                    "explicit error"
                );
            }
            ApiError::Constraint(constraint) => {
                tracing::debug!(code = constraint.code(), uri = %req.uri(), "constraint error");
            }
            ApiError::Unknown(cause) => {
                tracing::error!(
                    cause = %cause,
                    method = %req.method(),
                    uri = %req.uri(),
                    "unhandled error"
                );
            }
        }

        let (status, msg) = self.translate();
        try_respond(req, &json!({ "msg": msg }), status)
    }
}

impl<T> Validate for Json<T>
where
    T: Validate,
{
    type Error = <T as Validate>::Error;
    fn validate(self) -> Result<Self, Self::Error> {
        let inner = self.into_inner();
        let validated = inner.validate()?;
        Ok(Json(validated))
    }
}
