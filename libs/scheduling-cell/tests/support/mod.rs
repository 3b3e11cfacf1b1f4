// libs/scheduling-cell/tests/support/mod.rs
//
// In-memory store and clock helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::Mutex;

use scheduling_cell::{
    AppointmentFilter, AppointmentRef, AppointmentStatus, CalendarDate, ClockTime, Doctor,
    FixedClock, LocalTimestamp, MedicalField, SchedulingStore, SearchResults, StoreError,
    TemporalPolicyGuard,
};

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    ListFields,
    ListDoctors(i64),
    ListSlots(i64, String),
    Create { doctor_id: i64, appointment_date: String, notes: String },
    Reschedule { appointment_id: i64, new_date: String },
    Cancel(i64),
    ListAppointments(AppointmentFilter),
    Search(String),
}

#[derive(Default)]
struct Inner {
    fields: Vec<MedicalField>,
    doctors: Vec<(i64, Doctor)>,
    slots: Vec<ClockTime>,
    appointments: Vec<AppointmentRef>,
    calls: Vec<StoreCall>,
    next_id: i64,
    reject_create: Option<String>,
    fail_listing: bool,
}

/// A directory and appointment book held in memory. Every call is recorded.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
    submit_delay: Option<Duration>,
}

impl InMemoryStore {
    /// Cardiology (1) with Dr. Smith (7); Dermatology (2) with Dr. Jones (9).
    pub fn clinic() -> Self {
        let cardiology = MedicalField { id: 1, name: "Cardiology".to_string(), description: None };
        let dermatology = MedicalField { id: 2, name: "Dermatology".to_string(), description: None };
        let inner = Inner {
            fields: vec![cardiology.clone(), dermatology.clone()],
            doctors: vec![
                (1, Doctor { id: 7, name: "Dr. Smith".to_string(), experience_years: Some(12), medical_field: Some(cardiology) }),
                (2, Doctor { id: 9, name: "Dr. Jones".to_string(), experience_years: Some(4), medical_field: Some(dermatology) }),
            ],
            slots: ["09:00", "10:30", "14:30"]
                .iter()
                .filter_map(|t| scheduling_cell::services::codec::parse_display_time(t))
                .collect(),
            next_id: 100,
            ..Inner::default()
        };

        Self { inner: Arc::new(Mutex::new(inner)), submit_delay: None }
    }

    /// Hold every write for `delay` so overlapping submissions can be observed.
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    pub async fn reject_bookings_with(&self, message: &str) {
        self.inner.lock().await.reject_create = Some(message.to_string());
    }

    pub async fn fail_listings(&self) {
        self.inner.lock().await.fail_listing = true;
    }

    pub async fn seed_appointment(&self, id: i64, at: &str, status: AppointmentStatus) {
        let appointment = AppointmentRef {
            id,
            doctor_id: 7,
            doctor_name: "Dr. Smith".to_string(),
            medical_field_id: Some(1),
            medical_field_name: Some("Cardiology".to_string()),
            appointment_date: LocalTimestamp::parse(at).expect("seed timestamp"),
            status,
            notes: None,
        };
        self.inner.lock().await.appointments.push(appointment);
    }

    pub async fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().await.calls.clone()
    }

    pub async fn appointments(&self) -> Vec<AppointmentRef> {
        self.inner.lock().await.appointments.clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SchedulingStore for InMemoryStore {
    async fn list_medical_fields(&self) -> Result<Vec<MedicalField>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(StoreCall::ListFields);
        Ok(inner.fields.clone())
    }

    async fn list_doctors(&self, field_id: i64) -> Result<Vec<Doctor>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(StoreCall::ListDoctors(field_id));
        Ok(inner
            .doctors
            .iter()
            .filter(|(field, _)| *field == field_id)
            .map(|(_, doctor)| doctor.clone())
            .collect())
    }

    async fn list_available_slots(&self, doctor_id: i64, date: CalendarDate) -> Result<Vec<ClockTime>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(StoreCall::ListSlots(doctor_id, date.to_string()));
        Ok(inner.slots.clone())
    }

    async fn create_appointment(
        &self,
        doctor_id: i64,
        appointment_date: LocalTimestamp,
        notes: String,
    ) -> Result<AppointmentRef, StoreError> {
        self.inner.lock().await.calls.push(StoreCall::Create {
            doctor_id,
            appointment_date: appointment_date.to_string(),
            notes: notes.clone(),
        });
        self.pause().await;

        let mut inner = self.inner.lock().await;
        if let Some(message) = inner.reject_create.clone() {
            return Err(StoreError::Rejected(message));
        }

        let id = inner.next_id;
        inner.next_id += 1;
        let doctor_name = inner
            .doctors
            .iter()
            .find(|(_, d)| d.id == doctor_id)
            .map(|(_, d)| d.name.clone())
            .unwrap_or_default();
        let appointment = AppointmentRef {
            id,
            doctor_id,
            doctor_name,
            medical_field_id: None,
            medical_field_name: None,
            appointment_date,
            status: AppointmentStatus::Scheduled,
            notes: (!notes.is_empty()).then_some(notes),
        };
        inner.appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn reschedule_appointment(
        &self,
        appointment_id: i64,
        new_date: LocalTimestamp,
    ) -> Result<AppointmentRef, StoreError> {
        self.inner.lock().await.calls.push(StoreCall::Reschedule {
            appointment_id,
            new_date: new_date.to_string(),
        });
        self.pause().await;

        let mut inner = self.inner.lock().await;
        let appointment = inner
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id)
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", appointment_id)))?;
        appointment.appointment_date = new_date;
        appointment.status = AppointmentStatus::Rescheduled;
        Ok(appointment.clone())
    }

    async fn cancel_appointment(&self, appointment_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(StoreCall::Cancel(appointment_id));
        let appointment = inner
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id)
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", appointment_id)))?;
        appointment.status = AppointmentStatus::Cancelled;
        Ok(())
    }

    async fn list_appointments(&self, filter: AppointmentFilter) -> Result<Vec<AppointmentRef>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(StoreCall::ListAppointments(filter));
        if inner.fail_listing {
            return Err(StoreError::Transport("connection reset".to_string()));
        }
        Ok(inner.appointments.clone())
    }

    async fn search_directory(&self, query: String) -> Result<SearchResults, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(StoreCall::Search(query.clone()));
        let needle = query.to_lowercase();
        Ok(SearchResults {
            doctors: inner
                .doctors
                .iter()
                .map(|(_, d)| d.clone())
                .filter(|d| d.name.to_lowercase().contains(&needle))
                .collect(),
            medical_fields: inner
                .fields
                .iter()
                .filter(|f| f.name.to_lowercase().contains(&needle))
                .cloned()
                .collect(),
        })
    }
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, 0))
        .expect("valid test instant")
}

/// A policy guard whose clock the test controls.
pub fn guard_at(now: NaiveDateTime) -> (TemporalPolicyGuard, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(now));
    (TemporalPolicyGuard::new(clock.clone()), clock)
}
