pub mod cache;
pub mod calculator;
pub mod handlers;
pub mod normalizer;
pub mod registry;
pub mod solver;
pub mod store;
