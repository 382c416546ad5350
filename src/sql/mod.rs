pub mod optimizer;
pub mod plan;
