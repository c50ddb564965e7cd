// Application layer - Controllers and the ports they drive
pub mod chart_adapter;
pub mod chart_backend;
pub mod document;
pub mod event_dispatcher;
pub mod live_update;
pub mod notification_queue;
pub mod otp_controller;
pub mod preference_store;
pub mod refresh_scheduler;
pub mod reset_form;
pub mod sequencer;
pub mod stat_patcher;
pub mod stats_source;
