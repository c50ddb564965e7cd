// Domain layer - pure data types and input state machines
pub mod chart;
pub mod format;
pub mod notification;
pub mod otp;
pub mod password;
pub mod refresh;
pub mod stats;
