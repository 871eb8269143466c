pub mod attendance;
pub mod clock;
mod key_lock;

pub use attendance::{AttendanceService, ServiceSettings};
