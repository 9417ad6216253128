pub mod break_entry;
pub mod capture;
pub mod session;

pub use break_entry::{BreakEntry, BreakType};
pub use capture::ScreenCapture;
pub use session::{AttendanceSession, SessionStatus};
