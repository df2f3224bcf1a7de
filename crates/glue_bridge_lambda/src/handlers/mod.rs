pub mod chain;
pub mod poll_loop;
pub mod resolver;
pub mod step_runner;
pub mod submitter;

#[cfg(test)]
pub(crate) mod fakes;
