mod app;
mod config;
mod coordinator;
mod effects;
#[cfg(test)]
mod fakes;
mod prompts;

pub use app::run_app;
