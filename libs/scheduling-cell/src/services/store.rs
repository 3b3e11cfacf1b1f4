// libs/scheduling-cell/src/services/store.rs
use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{
    AppointmentFilter, AppointmentRef, CalendarDate, ClockTime, Doctor, LocalTimestamp,
    MedicalField, SearchResults,
};

/// Operations the host supplies: directory lookups, availability, and the
/// appointment store. The scheduling core only calls these; it never
/// implements persistence or transport itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn list_medical_fields(&self) -> Result<Vec<MedicalField>, StoreError>;

    async fn list_doctors(&self, field_id: i64) -> Result<Vec<Doctor>, StoreError>;

    async fn list_available_slots(
        &self,
        doctor_id: i64,
        date: CalendarDate,
    ) -> Result<Vec<ClockTime>, StoreError>;

    async fn create_appointment(
        &self,
        doctor_id: i64,
        appointment_date: LocalTimestamp,
        notes: String,
    ) -> Result<AppointmentRef, StoreError>;

    async fn reschedule_appointment(
        &self,
        appointment_id: i64,
        new_date: LocalTimestamp,
    ) -> Result<AppointmentRef, StoreError>;

    async fn cancel_appointment(&self, appointment_id: i64) -> Result<(), StoreError>;

    async fn list_appointments(
        &self,
        filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentRef>, StoreError>;

    async fn search_directory(&self, query: String) -> Result<SearchResults, StoreError>;
}
