pub mod blend;
pub mod config;
pub mod pipeline;
pub mod util;
