//! A static variable set once, to the time at which the application started.
//!
//! The stopped clock (testing) uses this as its default fixed time outside
//! of a test context; the working clock ignores it entirely and always
//! reads the system clock.
use std::time::SystemTime;

lazy_static! {
    /// The time at which the application started.
    pub static ref TIME_AT_APP_START: SystemTime = SystemTime::now();
}
