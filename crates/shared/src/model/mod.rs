use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::response_errors::StoreError;

pub mod validate;

mod exercise;
pub use exercise::*;

mod cycle;
pub use cycle::*;

mod task;
pub use task::*;

mod completion;
pub use completion::*;

#[cfg(feature = "backend")]
mod update;
#[cfg(feature = "backend")]
pub use update::*;

/// Checks a payload and turns it into the value the store works with
pub trait ValidateModel {
    type Valid;

    fn validate(self) -> Result<Self::Valid, StoreError>;
}

/// The four stored resource kinds, used to label errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Exercise,
    RecoveryCycle,
    TrainingTask,
    Completion,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Exercise => "exercise",
            Entity::RecoveryCycle => "recovery cycle",
            Entity::TrainingTask => "training task",
            Entity::Completion => "completion",
        };
        f.write_str(name)
    }
}

#[cfg(all(test, feature = "backend"))]
pub(crate) mod fixtures;
