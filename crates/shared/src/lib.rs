pub mod api;
pub mod model;
pub mod table;

#[cfg(feature = "backend")]
pub mod db;

mod utils;
pub use utils::*;
