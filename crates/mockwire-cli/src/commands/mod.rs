pub mod plan;
pub mod play;
