// railnav_core/src/lib.rs

pub mod errors;
pub mod estimation;
pub mod fleet;
pub mod messages;
pub mod models;
pub mod prelude;
pub mod speed;
pub mod track;
pub mod types;
pub mod utils;
