#[cfg(test)]
pub mod common;

mod bind_flow;
mod sample_config;
