use actix_web::{HttpResponse, ResponseError};
use failure::Fail;
use log::error;
use serde::Serialize;
use std::borrow::Cow;
use syllabus_macros::From;

pub use actix_web::http::StatusCode;
pub use syllabus_macros::ApiError;

/// An error that occurred while handling an API request.
pub trait ApiError: Fail {
    /// HTTP response status code.
    fn status(&self) -> StatusCode;

    /// Internal code describing this error.
    ///
    /// This code is used to identify this error outside the system, and thus
    /// should only be present for errors which are intended to be reported
    /// to the user in detail.
    fn code(&self) -> Option<Cow<str>>;
}

/// Required for `#[cause]` on a `Box<dyn ApiError>`.
impl Fail for Box<dyn ApiError> {
    fn name(&self) -> Option<&str> {
        (**self).name()
    }

    fn cause(&self) -> Option<&dyn Fail> {
        (**self).cause()
    }

    fn backtrace(&self) -> Option<&failure::Backtrace> {
        (**self).backtrace()
    }
}

/// A wrapper around many types of errors, including user-facing [`ApiError`]s
/// as well as errors which should not be reported to the user in detail, such
/// as database connection errors.
#[derive(Debug, Fail, From)]
pub enum Error {
    #[fail(display = "{}", _0)]
    Api(#[cause] Box<dyn ApiError>),
    /// Generic system error.
    #[fail(display = "{}", _0)]
    System(#[cause] #[from] std::io::Error),
    /// Error communicating with the database.
    ///
    /// Note that this variant also includes errors related to missing record,
    /// you may want to turn them into [`ApiError`]s instead:
    ///
    /// ```ignore
    /// database_operation
    ///     .optional()?
    ///     .ok_or_else(|| MyApiError::NotFound)?
    /// ```
    #[fail(display = "{}", _0)]
    Db(#[cause] #[from] diesel::result::Error),
    /// Error obtaining database connection from the pool.
    #[fail(display = "{}", _0)]
    DbPool(#[cause] #[from] r2d2::Error),
    /// Error reading request payload.
    #[fail(display = "{}", _0)]
    Payload(#[from] actix_web::error::PayloadError),
}

impl<T: ApiError> From<T> for Error {
    fn from(error: T) -> Error {
        Error::Api(Box::new(error))
    }
}

impl ResponseError for Error {
    fn error_response(&self) -> HttpResponse {
        match self {
            Error::Api(err) => match err.code() {
                Some(code) => HttpResponse::build(err.status())
                    .json(ErrorResponse {
                        error: code,
                        raw: err.to_string(),
                    }),
                None => {
                    error!("{}", err);
                    HttpResponse::new(err.status())
                }
            },
            Error::Payload(e) => e.error_response(),
            _ => {
                error!("{}", self);
                HttpResponse::InternalServerError()
                    .finish()
            }
        }
    }

    fn render_response(&self) -> HttpResponse {
        self.error_response()
    }
}

/// Body of an error response.
#[derive(Debug, Serialize)]
struct ErrorResponse<'s> {
    error: Cow<'s, str>,
    raw: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(ApiError, Debug, Fail)]
    enum TestError {
        #[fail(display = "no such thing")]
        #[api(code = "thing:not-found", status = "NOT_FOUND")]
        NotFound,
        #[fail(display = "broken")]
        #[api(internal)]
        Broken,
        #[fail(display = "{}", _0)]
        Nested(#[cause] NestedError),
    }

    #[derive(ApiError, Debug, Fail)]
    #[api(code = "thing:nested", status = "CONFLICT")]
    #[fail(display = "nested")]
    struct NestedError;

    #[test]
    fn derived_statuses_and_codes() {
        assert_eq!(TestError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(TestError::NotFound.code().as_ref().map(|c| &**c),
            Some("thing:not-found"));

        assert_eq!(TestError::Broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(TestError::Broken.code().is_none());

        let nested = TestError::Nested(NestedError);
        assert_eq!(nested.status(), StatusCode::CONFLICT);
        assert_eq!(nested.code().as_ref().map(|c| &**c), Some("thing:nested"));
    }

    #[test]
    fn api_errors_render_their_status() {
        let error = Error::from(TestError::NotFound);
        assert_eq!(error.error_response().status(), StatusCode::NOT_FOUND);

        let error = Error::from(TestError::Broken);
        assert_eq!(error.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR);
    }
}
