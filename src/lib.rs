pub mod audit;
pub mod config;
pub mod csv_out;
pub mod issue;
pub mod logging;
pub mod naming;
pub mod pipeline;
pub mod project;
pub mod record;
