/// Runtime module - Gateway

mod runner;

pub use runner::Runner;
