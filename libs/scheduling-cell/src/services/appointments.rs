// libs/scheduling-cell/src/services/appointments.rs
use std::sync::Arc;

use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::{debug, error, info};

use crate::error::{AppointmentBoardError, RescheduleError, StoreError};
use crate::models::{AppointmentFilter, AppointmentRef, MedicalField};
use crate::services::policy::TemporalPolicyGuard;
use crate::services::reschedule::RescheduleFlow;
use crate::services::store::SchedulingStore;

/// Active status and a start strictly after `now`, to the second.
pub fn can_modify_at(appointment: &AppointmentRef, now: NaiveDateTime) -> bool {
    if !appointment.status.is_active() {
        return false;
    }
    let date = appointment.appointment_date.date();
    let time = appointment.appointment_date.time();
    let when = (date.year(), date.month(), date.day(), time.hour(), time.minute(), appointment.appointment_date.second());
    when > (now.year(), now.month(), now.day(), now.hour(), now.minute(), now.second())
}

// ==============================================================================
// APPOINTMENT BOARD
// ==============================================================================

/// The user's appointment list under one filter, with cancel and reschedule.
pub struct AppointmentBoard {
    store: Arc<dyn SchedulingStore>,
    guard: TemporalPolicyGuard,
    filter: AppointmentFilter,
    appointments: Vec<AppointmentRef>,
    error: Option<String>,
}

impl AppointmentBoard {
    pub fn new(store: Arc<dyn SchedulingStore>, guard: TemporalPolicyGuard) -> Self {
        Self {
            store,
            guard,
            filter: AppointmentFilter::All,
            appointments: Vec::new(),
            error: None,
        }
    }

    pub fn filter(&self) -> AppointmentFilter {
        self.filter
    }

    pub fn appointments(&self) -> &[AppointmentRef] {
        &self.appointments
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn find(&self, appointment_id: i64) -> Option<&AppointmentRef> {
        self.appointments.iter().find(|a| a.id == appointment_id)
    }

    pub fn can_modify(&self, appointment: &AppointmentRef) -> bool {
        can_modify_at(appointment, self.guard.now())
    }

    pub async fn load(&mut self, filter: AppointmentFilter) -> Result<&[AppointmentRef], AppointmentBoardError> {
        self.filter = filter;
        self.reload().await
    }

    /// Switch filter; a no-op when the filter is unchanged.
    pub async fn set_filter(&mut self, filter: AppointmentFilter) -> Result<&[AppointmentRef], AppointmentBoardError> {
        if filter == self.filter && !self.appointments.is_empty() {
            return Ok(&self.appointments);
        }
        self.load(filter).await
    }

    pub async fn reload(&mut self) -> Result<&[AppointmentRef], AppointmentBoardError> {
        match self.store.list_appointments(self.filter).await {
            Ok(mut appointments) => {
                appointments.sort_by(|a, b| a.appointment_date.cmp(&b.appointment_date));
                debug!("Loaded {} {} appointments", appointments.len(), self.filter);
                self.appointments = appointments;
                self.error = None;
                Ok(&self.appointments)
            }
            Err(e) => {
                error!("Failed to load {} appointments: {}", self.filter, e);
                self.error = Some(e.to_string());
                Err(AppointmentBoardError::Store(e))
            }
        }
    }

    fn modifiable(&self, appointment_id: i64) -> Result<&AppointmentRef, AppointmentBoardError> {
        let appointment = self
            .find(appointment_id)
            .ok_or(AppointmentBoardError::UnknownAppointment(appointment_id))?;
        if !self.can_modify(appointment) {
            return Err(AppointmentBoardError::NotModifiable(appointment_id));
        }
        Ok(appointment)
    }

    /// Cancel, then reload the current filter. On a refused cancellation the
    /// list is left as it was and the store's message is kept for display.
    pub async fn cancel(&mut self, appointment_id: i64) -> Result<(), AppointmentBoardError> {
        if let Err(e) = self.modifiable(appointment_id).map(|_| ()) {
            self.error = Some(e.to_string());
            return Err(e);
        }

        info!("Cancelling appointment {}", appointment_id);
        if let Err(e) = self.store.cancel_appointment(appointment_id).await {
            error!("Failed to cancel appointment {}: {}", appointment_id, e);
            self.error = Some(e.to_string());
            return Err(AppointmentBoardError::Store(e));
        }

        self.reload().await?;
        info!("Appointment {} cancelled", appointment_id);
        Ok(())
    }

    /// Open the reschedule dialog for one listed appointment.
    pub fn begin_reschedule(&mut self, appointment_id: i64) -> Result<RescheduleFlow, AppointmentBoardError> {
        let appointment = match self.modifiable(appointment_id).cloned() {
            Ok(appointment) => appointment,
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e);
            }
        };

        RescheduleFlow::open(self.store.clone(), self.guard.clone(), appointment)
            .map(|flow| flow.with_reload_filter(self.filter))
            .map_err(|e| match e {
                RescheduleError::NotModifiable(id) => AppointmentBoardError::NotModifiable(id),
                other => AppointmentBoardError::Store(StoreError::Rejected(other.to_string())),
            })
    }

    /// Take the list reloaded by a finished reschedule, if it has one.
    pub fn absorb(&mut self, appointments: Option<Vec<AppointmentRef>>) {
        if let Some(appointments) = appointments {
            self.appointments = appointments;
            self.error = None;
        }
    }
}

// ==============================================================================
// DASHBOARD
// ==============================================================================

#[derive(Debug, Clone, Default)]
pub struct DashboardSummary {
    pub upcoming: Vec<AppointmentRef>,
    pub past: Vec<AppointmentRef>,
    pub medical_fields: Vec<MedicalField>,
}

impl DashboardSummary {
    /// Upcoming, past and the field catalogue, fetched concurrently.
    pub async fn load(store: &dyn SchedulingStore) -> Result<Self, StoreError> {
        let (upcoming, past, medical_fields) = futures::try_join!(
            store.list_appointments(AppointmentFilter::Upcoming),
            store.list_appointments(AppointmentFilter::Past),
            store.list_medical_fields(),
        )?;

        debug!("Dashboard: {} upcoming, {} past, {} fields", upcoming.len(), past.len(), medical_fields.len());
        Ok(Self { upcoming, past, medical_fields })
    }

    /// No appointments of any kind yet.
    pub fn is_new_user(&self) -> bool {
        self.upcoming.is_empty() && self.past.is_empty()
    }

    pub fn next_appointment(&self) -> Option<&AppointmentRef> {
        self.upcoming.iter().min_by(|a, b| a.appointment_date.cmp(&b.appointment_date))
    }
}
