pub mod domain;
pub mod ports;
pub mod query;
pub mod roster;
pub mod status;
pub mod sync;

pub use domain::{
    ConfigChange, ConfigData, ConfigList, GoogleUser, SchoolData, StudentProfile, VisitOutcome,
};
pub use ports::{IdentityService, PortError, PortResult, SheetSnapshot, SpreadsheetStore};
pub use query::{DashboardSummary, FilterState, SortDirection, SortKey, SortState};
pub use roster::Roster;
pub use status::{next_action, NextAction};
pub use sync::SyncService;
