pub mod attendance_state;
pub mod check_in_record;
pub mod role;
pub mod shift;
