pub mod search;
pub mod speech;
