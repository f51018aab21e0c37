pub mod rate;
pub mod sessions;
pub mod tokens;
