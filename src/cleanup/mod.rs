pub mod processor;
pub mod store;
pub mod task;
