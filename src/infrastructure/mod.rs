// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod http_stats_source;
pub mod memory_document;
pub mod page_data;
pub mod preferences;
pub mod text_chart;
