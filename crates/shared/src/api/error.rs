use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};
#[cfg(feature = "backend")]
use {
    axum::{
        response::{IntoResponse, Response},
        Json,
    },
    tracing::error,
};

/// Error type for routes that have no domain specific failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Nothing {}

impl fmt::Display for Nothing {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

/// Error returned by every route. `Inner` carries a domain error together with
/// the status code it maps to, `Other` is anything unexpected (storage, pool,
/// migrations) and always maps to a 500
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerError<T> {
    Inner {
        #[serde(with = "http_serde::status_code")]
        code: StatusCode,
        inner: T,
    },
    Other {
        message: String,
    },
}

impl<T> ServerError<T> {
    pub fn code(&self) -> StatusCode {
        match self {
            Self::Inner { code, .. } => *code,
            Self::Other { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The domain error, if this isn't an unexpected failure
    pub fn inner(&self) -> Option<&T> {
        match self {
            Self::Inner { inner, .. } => Some(inner),
            Self::Other { .. } => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for ServerError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner { inner, .. } => write!(f, "{inner}"),
            Self::Other { message } => write!(f, "Something went wrong: {message}"),
        }
    }
}

impl<T: fmt::Debug + fmt::Display> std::error::Error for ServerError<T> {}

#[macro_export]
macro_rules! other_error {
    ($($arg:tt)*) => {
        $crate::api::error::ServerError::Other { message: format!($($arg)*) }
    };
}

#[cfg(feature = "backend")]
impl<T> From<rusqlite::Error> for ServerError<T> {
    #[track_caller]
    fn from(err: rusqlite::Error) -> Self {
        other_error!("rusqlite: {err:?}")
    }
}

#[cfg(feature = "backend")]
impl<T> From<deadpool_sqlite::InteractError> for ServerError<T> {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        other_error!("interact: {err:?}")
    }
}

#[cfg(feature = "backend")]
impl<T> From<deadpool_sqlite::PoolError> for ServerError<T> {
    fn from(err: deadpool_sqlite::PoolError) -> Self {
        other_error!("pool: {err:?}")
    }
}

#[cfg(feature = "backend")]
#[derive(Serialize)]
struct ErrorBody<'a, T> {
    error: String,
    detail: &'a ServerError<T>,
}

// Render ServerError into a json response
#[cfg(feature = "backend")]
impl<T: Serialize + fmt::Display> IntoResponse for ServerError<T> {
    fn into_response(self) -> Response {
        let code = self.code();
        if let Self::Other { message } = &self {
            error!(reason = %message, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            detail: &self,
        };
        (code, Json(body)).into_response()
    }
}
