pub mod attendance;
pub mod broadcast;
