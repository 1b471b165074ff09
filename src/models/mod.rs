pub mod rebalancing;
pub mod schedule;
pub mod settings;
pub mod task;
pub mod template;
pub mod workload;
