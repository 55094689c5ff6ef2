//! Student attendance core: entry/exit marking, attendance reports and the
//! JSON-lines sidecar protocol the desktop shell talks to.

pub mod admin;
pub mod attendance;
pub mod calendar;
pub mod clock;
pub mod db;
pub mod error;
pub mod export;
pub mod ipc;
pub mod model;
pub mod reports;
pub mod setup;

pub use attendance::{AttendanceService, Confirmation, MarkKind};
pub use clock::{Clock, FixedClock, SystemClock};
pub use db::Store;
pub use error::{AttendanceError, ErrorKind};
pub use reports::{ReportEngine, ReportTable};
