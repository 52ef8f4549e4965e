//! Fleet capacity and quota aggregation engine.

pub mod aggregate;
pub mod assemble;
pub mod discovery;
pub mod engine;
pub mod fetch;
pub mod quota;
pub mod rate_limit;
pub mod types;
pub mod upstream;

#[cfg(test)]
pub mod testing;
