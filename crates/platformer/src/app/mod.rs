mod bootstrap;
mod keys;
mod loop_runner;
mod metrics;
mod renderer;
mod world;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;
