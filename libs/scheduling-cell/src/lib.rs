pub mod models;
pub mod services;
pub mod error;

pub use models::*;
pub use error::*;
pub use services::appointments::{can_modify_at, AppointmentBoard, DashboardSummary};
pub use services::input::{DateField, FieldEmission, FieldState, Key, KeyDecision, KeyPress, TimeField};
pub use services::policy::{Clock, FixedClock, SystemClock, TemporalPolicyGuard};
pub use services::reschedule::{RescheduleFlow, RescheduleOutcome};
pub use services::search::search_directory;
pub use services::store::SchedulingStore;
pub use services::wizard::BookingWizard;
