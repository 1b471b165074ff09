pub mod conflict_detector;
pub mod impact_estimator;
pub mod rebalancing_service;
pub mod schedule_utils;
pub mod settings_service;
pub mod suggestion_applier;
pub mod suggestion_generator;
pub mod task_status_service;
pub mod template_scheduler;
pub mod workload_calculator;
