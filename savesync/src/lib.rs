pub mod app;
pub mod archive;
pub mod context;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod lock;
pub mod monitor;
pub mod pipeline;
pub mod process;
pub mod replica;
pub mod session;

#[cfg(test)]
mod tests;
