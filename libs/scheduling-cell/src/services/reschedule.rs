// libs/scheduling-cell/src/services/reschedule.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{PolicyViolation, RescheduleError};
use crate::models::{AppointmentFilter, AppointmentRef, CalendarDate, ClockTime, LocalTimestamp};
use crate::services::codec;
use crate::services::input::{DateField, FieldEmission, TimeField};
use crate::services::policy::TemporalPolicyGuard;
use crate::services::store::SchedulingStore;
use crate::services::wizard::InFlight;

/// Result of a successful reschedule. `appointments` is the reloaded list,
/// or `None` when the reload after the change failed.
#[derive(Debug, Clone)]
pub struct RescheduleOutcome {
    pub appointment: AppointmentRef,
    pub appointments: Option<Vec<AppointmentRef>>,
}

/// Editing dialog for moving one existing appointment.
pub struct RescheduleFlow {
    store: Arc<dyn SchedulingStore>,
    guard: TemporalPolicyGuard,
    appointment: AppointmentRef,
    reload_filter: AppointmentFilter,
    date_input: DateField,
    time_input: TimeField,
    date: Option<CalendarDate>,
    time: Option<ClockTime>,
    date_rejection: Option<PolicyViolation>,
    violation: Option<PolicyViolation>,
    error: Option<String>,
    submitting: AtomicBool,
}

impl RescheduleFlow {
    /// Open the dialog seeded with the appointment's current date and time.
    pub fn open(
        store: Arc<dyn SchedulingStore>,
        guard: TemporalPolicyGuard,
        appointment: AppointmentRef,
    ) -> Result<Self, RescheduleError> {
        if !appointment.status.is_active() {
            warn!("Refusing to reschedule appointment {} with status {}", appointment.id, appointment.status);
            return Err(RescheduleError::NotModifiable(appointment.id));
        }

        let (date, time) = appointment.appointment_date.split();

        let mut date_input = DateField::with_policy(guard.clone());
        date_input.set_value(Some(date));
        let mut time_input = TimeField::new();
        time_input.set_value(Some(time));

        let mut flow = Self {
            store,
            guard,
            appointment,
            reload_filter: AppointmentFilter::All,
            date_input,
            time_input,
            date: Some(date),
            time: Some(time),
            date_rejection: None,
            violation: None,
            error: None,
            submitting: AtomicBool::new(false),
        };
        flow.revalidate();

        debug!("Opened reschedule for appointment {} at {}", flow.appointment.id, flow.appointment.appointment_date);
        Ok(flow)
    }

    /// List to reload after a successful change. Defaults to all appointments.
    pub fn with_reload_filter(mut self, filter: AppointmentFilter) -> Self {
        self.reload_filter = filter;
        self
    }

    pub fn appointment(&self) -> &AppointmentRef {
        &self.appointment
    }

    pub fn date(&self) -> Option<CalendarDate> {
        self.date
    }

    pub fn time(&self) -> Option<ClockTime> {
        self.time
    }

    pub fn date_input(&self) -> &DateField {
        &self.date_input
    }

    pub fn time_input(&self) -> &TimeField {
        &self.time_input
    }

    pub fn violation(&self) -> Option<PolicyViolation> {
        self.violation
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Both parts present, no policy violation and nothing in flight.
    pub fn can_submit(&self) -> bool {
        self.date.is_some() && self.time.is_some() && self.violation.is_none() && !self.is_submitting()
    }

    pub fn pending_timestamp(&self) -> Option<LocalTimestamp> {
        codec::combine_local_timestamp(self.date.as_ref(), self.time.as_ref())
    }

    /// Re-run the date rule and, with a time present, the combined rule.
    /// A typed date refused by the field stays reported until the date changes.
    fn revalidate(&mut self) {
        self.violation = match self.date {
            Some(date) => self.guard.check_schedule(&date, self.time.as_ref()).err(),
            None => self.date_rejection,
        };
        self.error = self.violation.map(|v| v.to_string());
    }

    pub fn set_date(&mut self, date: Option<CalendarDate>) {
        self.date = date;
        self.date_rejection = None;
        self.date_input.set_value(date);
        self.revalidate();
    }

    pub fn set_time(&mut self, time: Option<ClockTime>) {
        self.time = time;
        self.time_input.set_value(time);
        self.revalidate();
    }

    fn apply_date(&mut self, emission: FieldEmission<CalendarDate>) {
        let (date, rejection) = match emission {
            FieldEmission::Unchanged => return,
            FieldEmission::Value(date) => (Some(date), None),
            FieldEmission::Cleared => (None, None),
            FieldEmission::Rejected(violation) => (None, Some(violation)),
        };
        self.date = date;
        self.date_rejection = rejection;
        self.revalidate();
    }

    fn apply_time(&mut self, emission: FieldEmission<ClockTime>) {
        match emission {
            FieldEmission::Unchanged => return,
            FieldEmission::Value(time) => self.time = Some(time),
            FieldEmission::Cleared | FieldEmission::Rejected(_) => self.time = None,
        }
        self.revalidate();
    }

    pub fn input_date(&mut self, raw: &str) {
        let emission = self.date_input.input(raw);
        self.apply_date(emission);
    }

    pub fn type_date(&mut self, typed: &str) {
        let emission = self.date_input.type_text(typed);
        self.apply_date(emission);
    }

    pub fn blur_date(&mut self) {
        let emission = self.date_input.blur();
        self.apply_date(emission);
    }

    pub fn input_time(&mut self, raw: &str) {
        let emission = self.time_input.input(raw);
        self.apply_time(emission);
    }

    pub fn type_time(&mut self, typed: &str) {
        let emission = self.time_input.type_text(typed);
        self.apply_time(emission);
    }

    pub fn blur_time(&mut self) {
        let emission = self.time_input.blur();
        self.apply_time(emission);
    }

    /// Send the new timestamp, then reload the appointment list. A failed
    /// reload is logged and does not fail the reschedule.
    pub async fn submit(&self) -> Result<RescheduleOutcome, RescheduleError> {
        let Some(_in_flight) = InFlight::acquire(&self.submitting) else {
            return Err(RescheduleError::SubmissionInFlight);
        };

        let (Some(date), Some(time)) = (self.date, self.time) else {
            return Err(RescheduleError::Incomplete);
        };

        // Re-checked against the current clock, not the last keystroke.
        self.guard.check_schedule(&date, Some(&time))?;
        let new_date = self.pending_timestamp().ok_or(RescheduleError::InvalidTimestamp)?;

        info!("Rescheduling appointment {} from {} to {}",
              self.appointment.id, self.appointment.appointment_date, new_date);

        let appointment = self
            .store
            .reschedule_appointment(self.appointment.id, new_date)
            .await
            .map_err(|e| {
                error!("Failed to reschedule appointment {}: {}", self.appointment.id, e);
                RescheduleError::Submission(e)
            })?;

        let appointments = match self.store.list_appointments(self.reload_filter).await {
            Ok(list) => Some(list),
            Err(e) => {
                warn!("Appointment {} rescheduled but reloading {} appointments failed: {}",
                      appointment.id, self.reload_filter, e);
                None
            }
        };

        info!("Appointment {} rescheduled to {}", appointment.id, appointment.appointment_date);
        Ok(RescheduleOutcome { appointment, appointments })
    }
}

impl std::fmt::Debug for RescheduleFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RescheduleFlow")
            .field("appointment_id", &self.appointment.id)
            .field("date", &self.date)
            .field("time", &self.time)
            .field("violation", &self.violation)
            .field("submitting", &self.is_submitting())
            .finish()
    }
}
