use chrono::NaiveDate;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{api::error::ServerError, model::Entity};

macro_rules! response_error {
    ($name:ident {
        $(
            #[code($variant_code:expr)]
            #[error($($message_tt:tt)*)]
            $variant:ident
            $({ $($var_struct_body_tt:tt)* })?
        ,)*
    }) => {

        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
        pub enum $name {
            $(
                #[error($($message_tt)*)]
                $variant $({
                    $($var_struct_body_tt)*
                })?,
            )*
        }

        impl $name {
            pub fn code(&self) -> StatusCode {
                match self {
                    $( $name::$variant { .. } => $variant_code, )*
                }
            }
        }

        impl From<$name> for ServerError<$name> {
            fn from(inner: $name) -> Self {
                Self::Inner { code: inner.code(), inner }
            }
        }
    };
}

response_error!(StoreError {
    #[code(StatusCode::BAD_REQUEST)]
    #[error("missing required fields: {}", .fields.join(", "))]
    MissingFields { fields: Vec<String> },
    #[code(StatusCode::BAD_REQUEST)]
    #[error("invalid {field}: {message}")]
    InvalidField { field: String, message: String },
    #[code(StatusCode::BAD_REQUEST)]
    #[error("start_date {start_date} is after end_date {end_date}")]
    InvalidDateRange { start_date: NaiveDate, end_date: NaiveDate },
    #[code(StatusCode::BAD_REQUEST)]
    #[error("no updatable fields were provided")]
    EmptyUpdate,
    #[code(StatusCode::NOT_FOUND)]
    #[error("{entity} {id} does not exist")]
    NotFound { entity: Entity, id: i64 },
    #[code(StatusCode::BAD_REQUEST)]
    #[error("referenced {entity} {id} does not exist")]
    MissingReference { entity: Entity, id: i64 },
    #[code(StatusCode::BAD_REQUEST)]
    #[error("{entity} {id} is still used by {references} training task(s)")]
    InUse { entity: Entity, id: i64, references: i64 },
});

impl StoreError {
    pub fn invalid<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::InvalidField { field: field.into(), message: message.into() }
    }

    pub fn not_found(entity: Entity, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn missing_reference(entity: Entity, id: i64) -> Self {
        Self::MissingReference { entity, id }
    }
}

pub type StoreResult<T> = Result<T, ServerError<StoreError>>;
