pub mod executions;
pub mod expectations;
pub mod scenarios;
pub mod system;
