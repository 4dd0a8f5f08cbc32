pub mod config;
pub mod dataset;
pub mod fetch;
pub mod humanize;
pub mod observability;
pub mod pipeline;
pub mod record;
pub mod render;
