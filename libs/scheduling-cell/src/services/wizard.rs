// libs/scheduling-cell/src/services/wizard.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{PolicyViolation, WizardError};
use crate::models::{
    AppointmentRef, CalendarDate, ClockTime, Doctor, InvalidatedSelection, LocalTimestamp,
    MedicalField, WizardStage, WizardState,
};
use crate::services::codec;
use crate::services::input::{DateField, FieldEmission, TimeField};
use crate::services::policy::TemporalPolicyGuard;
use crate::services::store::SchedulingStore;

/// Clears the in-flight flag when a submission ends, however it ends.
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One booking session: Field → Doctor → Date/Time → Confirm.
///
/// Owns its state exclusively; drop it on completion, cancellation or when the
/// user navigates away.
pub struct BookingWizard {
    session_id: Uuid,
    store: Arc<dyn SchedulingStore>,
    guard: TemporalPolicyGuard,
    state: WizardState,
    fields: Vec<MedicalField>,
    doctors: Vec<Doctor>,
    doctors_for_field: Option<i64>,
    slots: Vec<ClockTime>,
    slots_for: Option<(i64, CalendarDate)>,
    date_input: DateField,
    time_input: TimeField,
    error: Option<String>,
    submitting: AtomicBool,
}

impl BookingWizard {
    pub fn new(store: Arc<dyn SchedulingStore>, guard: TemporalPolicyGuard) -> Self {
        let session_id = Uuid::new_v4();
        debug!("Starting booking session {}", session_id);

        Self {
            session_id,
            store,
            date_input: DateField::with_policy(guard.clone()),
            time_input: TimeField::new(),
            guard,
            state: WizardState::default(),
            fields: Vec::new(),
            doctors: Vec::new(),
            doctors_for_field: None,
            slots: Vec::new(),
            slots_for: None,
            error: None,
            submitting: AtomicBool::new(false),
        }
    }

    // ==========================================================================
    // ACCESSORS
    // ==========================================================================

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn stage(&self) -> WizardStage {
        self.state.stage
    }

    pub fn fields(&self) -> &[MedicalField] {
        &self.fields
    }

    pub fn doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn slots(&self) -> &[ClockTime] {
        &self.slots
    }

    pub fn date_input(&self) -> &DateField {
        &self.date_input
    }

    pub fn time_input(&self) -> &TimeField {
        &self.time_input
    }

    /// The message currently shown to the user, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn selected_field(&self) -> Option<&MedicalField> {
        let id = self.state.selected_field_id?;
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn selected_doctor(&self) -> Option<&Doctor> {
        let id = self.state.selected_doctor_id?;
        self.doctors.iter().find(|doctor| doctor.id == id)
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    pub fn is_submit_enabled(&self) -> bool {
        self.state.stage == WizardStage::Confirm
            && self.pending_timestamp().is_some()
            && !self.is_submitting()
    }

    /// The timestamp a submission would send, if date and slot are both set.
    pub fn pending_timestamp(&self) -> Option<LocalTimestamp> {
        codec::combine_local_timestamp(self.state.selected_date.as_ref(), self.state.selected_slot.as_ref())
    }

    fn fail<T>(&mut self, err: WizardError) -> Result<T, WizardError> {
        warn!("Booking session {}: {}", self.session_id, err);
        self.error = Some(err.to_string());
        Err(err)
    }

    // ==========================================================================
    // OPTION LOADING
    // ==========================================================================

    pub async fn load_fields(&mut self) -> Result<&[MedicalField], WizardError> {
        match self.store.list_medical_fields().await {
            Ok(fields) => {
                debug!("Booking session {} loaded {} medical fields", self.session_id, fields.len());
                self.fields = fields;
                Ok(&self.fields)
            }
            Err(source) => {
                error!("Failed to load medical fields: {}", source);
                self.fail(WizardError::Load { what: "Failed to load medical fields", source })
            }
        }
    }

    pub async fn load_doctors(&mut self) -> Result<&[Doctor], WizardError> {
        let Some(field_id) = self.state.selected_field_id else {
            return self.fail(WizardError::MissingSelection("Please select a medical field"));
        };

        match self.store.list_doctors(field_id).await {
            Ok(doctors) => {
                debug!("Booking session {} loaded {} doctors for field {}",
                       self.session_id, doctors.len(), field_id);
                self.doctors = doctors;
                self.doctors_for_field = Some(field_id);
                Ok(&self.doctors)
            }
            Err(source) => {
                error!("Failed to load doctors for field {}: {}", field_id, source);
                self.fail(WizardError::Load { what: "Failed to load doctors", source })
            }
        }
    }

    /// Fetch availability for the selected doctor and date. Required again
    /// after every date or doctor change before a slot can be chosen.
    pub async fn load_slots(&mut self) -> Result<&[ClockTime], WizardError> {
        let (Some(doctor_id), Some(date)) = (self.state.selected_doctor_id, self.state.selected_date) else {
            return self.fail(WizardError::MissingSelection("Please select a doctor and a date"));
        };

        match self.store.list_available_slots(doctor_id, date).await {
            Ok(mut slots) => {
                slots.sort();
                slots.dedup();
                debug!("Booking session {} loaded {} slots for doctor {} on {}",
                       self.session_id, slots.len(), doctor_id, date);
                self.slots = slots;
                self.slots_for = Some((doctor_id, date));
                Ok(&self.slots)
            }
            Err(source) => {
                error!("Failed to load time slots for doctor {} on {}: {}", doctor_id, date, source);
                self.fail(WizardError::Load { what: "Failed to load time slots", source })
            }
        }
    }

    // ==========================================================================
    // SELECTIONS
    // ==========================================================================

    fn invalidate_doctor(&mut self, dropped: &mut Vec<InvalidatedSelection>) {
        if self.state.selected_doctor_id.take().is_some() {
            dropped.push(InvalidatedSelection::Doctor);
        }
        if self.doctors_for_field.take().is_some() || !self.doctors.is_empty() {
            self.doctors.clear();
            dropped.push(InvalidatedSelection::DoctorOptions);
        }
        self.invalidate_date(dropped);
    }

    fn invalidate_date(&mut self, dropped: &mut Vec<InvalidatedSelection>) {
        if self.state.selected_date.take().is_some() {
            dropped.push(InvalidatedSelection::Date);
        }
        self.date_input.clear();
        self.invalidate_slot(dropped);
    }

    fn invalidate_slot(&mut self, dropped: &mut Vec<InvalidatedSelection>) {
        if self.state.selected_slot.take().is_some() {
            dropped.push(InvalidatedSelection::Slot);
        }
        if self.slots_for.take().is_some() || !self.slots.is_empty() {
            self.slots.clear();
            dropped.push(InvalidatedSelection::SlotOptions);
        }
        self.time_input.clear();
        self.rewind_stage();
    }

    /// Step back to the first stage whose selection is missing. Never moves forward.
    fn rewind_stage(&mut self) {
        let earliest = if self.state.selected_field_id.is_none() {
            WizardStage::Field
        } else if self.state.selected_doctor_id.is_none() {
            WizardStage::Doctor
        } else if self.state.selected_date.is_none() || self.state.selected_slot.is_none() {
            WizardStage::Schedule
        } else {
            return;
        };

        if earliest.number() < self.state.stage.number() {
            debug!("Booking session {} rewound from stage {} to {}", self.session_id, self.state.stage, earliest);
            self.state.stage = earliest;
        }
    }

    fn log_invalidation(&self, cause: &str, dropped: &[InvalidatedSelection]) {
        if !dropped.is_empty() {
            debug!("Booking session {}: {} invalidated {:?}", self.session_id, cause, dropped);
        }
    }

    /// Choose the medical field. A different field drops the doctor and
    /// everything chosen after it.
    pub fn select_field(&mut self, field_id: i64) -> Result<Vec<InvalidatedSelection>, WizardError> {
        if !self.fields.iter().any(|field| field.id == field_id) {
            return self.fail(WizardError::UnknownOption { kind: "medical field", id: field_id });
        }

        self.error = None;
        let mut dropped = Vec::new();
        if self.state.selected_field_id != Some(field_id) {
            self.invalidate_doctor(&mut dropped);
            self.state.selected_field_id = Some(field_id);
            self.log_invalidation("field change", &dropped);
        }
        Ok(dropped)
    }

    /// Choose a doctor from the list loaded for the current field. A different
    /// doctor drops the date and slot.
    pub fn select_doctor(&mut self, doctor_id: i64) -> Result<Vec<InvalidatedSelection>, WizardError> {
        if self.state.selected_field_id.is_none() {
            return self.fail(WizardError::MissingSelection("Please select a medical field"));
        }
        if self.doctors_for_field != self.state.selected_field_id
            || !self.doctors.iter().any(|doctor| doctor.id == doctor_id)
        {
            return self.fail(WizardError::UnknownOption { kind: "doctor", id: doctor_id });
        }

        self.error = None;
        let mut dropped = Vec::new();
        if self.state.selected_doctor_id != Some(doctor_id) {
            self.invalidate_date(&mut dropped);
            self.state.selected_doctor_id = Some(doctor_id);
            self.log_invalidation("doctor change", &dropped);
        }
        Ok(dropped)
    }

    /// Set the appointment day. Past days are refused and clear the schedule
    /// stage; any other change drops the slot and the loaded slot options.
    pub fn enter_date(&mut self, date: CalendarDate) -> Result<Vec<InvalidatedSelection>, WizardError> {
        if self.state.selected_doctor_id.is_none() {
            return self.fail(WizardError::MissingSelection("Please select a doctor"));
        }

        let mut dropped = Vec::new();
        if let Err(violation) = self.guard.check_date(&date) {
            self.invalidate_date(&mut dropped);
            self.log_invalidation("past date", &dropped);
            return self.fail(violation.into());
        }

        self.error = None;
        if self.state.selected_date != Some(date) {
            self.invalidate_slot(&mut dropped);
            self.state.selected_date = Some(date);
            self.log_invalidation("date change", &dropped);
        }
        self.date_input.set_value(Some(date));
        Ok(dropped)
    }

    pub fn clear_date(&mut self) -> Vec<InvalidatedSelection> {
        let mut dropped = Vec::new();
        self.invalidate_date(&mut dropped);
        self.log_invalidation("date cleared", &dropped);
        dropped
    }

    /// Pick a time from the slots loaded for the current doctor and date.
    pub fn select_slot(&mut self, slot: ClockTime) -> Result<(), WizardError> {
        let (Some(doctor_id), Some(date)) = (self.state.selected_doctor_id, self.state.selected_date) else {
            self.clear_slot();
            return self.fail(WizardError::MissingSelection("Please select a date and time slot"));
        };
        if self.slots_for != Some((doctor_id, date)) {
            self.clear_slot();
            return self.fail(WizardError::SlotsNotLoaded);
        }
        if !self.slots.contains(&slot) {
            self.clear_slot();
            return self.fail(WizardError::SlotUnavailable);
        }
        if let Err(violation) = self.guard.check_schedule(&date, Some(&slot)) {
            self.clear_slot();
            return self.fail(violation.into());
        }

        self.error = None;
        self.state.selected_slot = Some(slot);
        self.time_input.set_value(Some(slot));
        debug!("Booking session {} selected slot {} on {}", self.session_id, slot, date);
        Ok(())
    }

    pub fn clear_slot(&mut self) {
        self.state.selected_slot = None;
        self.time_input.clear();
        self.rewind_stage();
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.state.notes = notes.into();
    }

    // ==========================================================================
    // TYPED INPUT
    // ==========================================================================

    fn apply_date_emission(
        &mut self,
        emission: FieldEmission<CalendarDate>,
    ) -> Result<Vec<InvalidatedSelection>, WizardError> {
        match emission {
            FieldEmission::Unchanged => Ok(Vec::new()),
            FieldEmission::Value(date) => self.enter_date(date),
            FieldEmission::Cleared => Ok(self.clear_date()),
            FieldEmission::Rejected(violation) => {
                let mut dropped = Vec::new();
                if self.state.selected_date.take().is_some() {
                    dropped.push(InvalidatedSelection::Date);
                }
                self.invalidate_slot(&mut dropped);
                self.log_invalidation("past date", &dropped);
                self.fail(violation.into())
            }
        }
    }

    fn apply_time_emission(&mut self, emission: FieldEmission<ClockTime>) -> Result<(), WizardError> {
        match emission {
            FieldEmission::Unchanged => Ok(()),
            FieldEmission::Value(time) => self.select_slot(time),
            FieldEmission::Cleared | FieldEmission::Rejected(_) => {
                self.state.selected_slot = None;
                self.rewind_stage();
                Ok(())
            }
        }
    }

    /// Feed typed characters into the date field (`dd/mm/yyyy`).
    pub fn type_date(&mut self, typed: &str) -> Result<Vec<InvalidatedSelection>, WizardError> {
        let emission = self.date_input.type_text(typed);
        self.apply_date_emission(emission)
    }

    pub fn blur_date(&mut self) -> Result<Vec<InvalidatedSelection>, WizardError> {
        let emission = self.date_input.blur();
        self.apply_date_emission(emission)
    }

    /// Feed typed characters into the time field (`HH:mm`).
    pub fn type_time(&mut self, typed: &str) -> Result<(), WizardError> {
        let emission = self.time_input.type_text(typed);
        self.apply_time_emission(emission)
    }

    pub fn blur_time(&mut self) -> Result<(), WizardError> {
        let emission = self.time_input.blur();
        self.apply_time_emission(emission)
    }

    // ==========================================================================
    // NAVIGATION
    // ==========================================================================

    fn validate_stage(&mut self) -> Result<(), WizardError> {
        match self.state.stage {
            WizardStage::Field if self.state.selected_field_id.is_none() => {
                Err(WizardError::MissingSelection("Please select a medical field"))
            }
            WizardStage::Doctor if self.state.selected_doctor_id.is_none() => {
                Err(WizardError::MissingSelection("Please select a doctor"))
            }
            WizardStage::Schedule => {
                let (Some(date), Some(slot)) = (self.state.selected_date, self.state.selected_slot) else {
                    return Err(WizardError::MissingSelection("Please select a date and time slot"));
                };

                match self.guard.check_schedule(&date, Some(&slot)) {
                    Ok(()) => Ok(()),
                    Err(PolicyViolation::PastDate) => {
                        let mut dropped = Vec::new();
                        self.invalidate_date(&mut dropped);
                        self.log_invalidation("stale past date", &dropped);
                        Err(PolicyViolation::PastDate.into())
                    }
                    Err(PolicyViolation::PastInstant) => {
                        self.clear_slot();
                        Err(PolicyViolation::PastInstant.into())
                    }
                }
            }
            WizardStage::Confirm => Err(WizardError::WrongStage(WizardStage::Confirm)),
            _ => Ok(()),
        }
    }

    /// Advance one stage if the current stage's selection is complete.
    /// On failure the stage is unchanged and the error is surfaced.
    pub fn next(&mut self) -> Result<WizardStage, WizardError> {
        if let Err(err) = self.validate_stage() {
            return self.fail(err);
        }

        let Some(next) = self.state.stage.next() else {
            return self.fail(WizardError::WrongStage(self.state.stage));
        };

        self.error = None;
        self.state.stage = next;
        info!("Booking session {} advanced to stage {} ({})", self.session_id, next.number(), next);
        Ok(next)
    }

    /// Go back one stage. Always allowed; selections are kept.
    pub fn back(&mut self) -> WizardStage {
        self.error = None;
        if let Some(previous) = self.state.stage.previous() {
            self.state.stage = previous;
            debug!("Booking session {} back to stage {}", self.session_id, previous);
        }
        self.state.stage
    }

    // ==========================================================================
    // PREFILL AND SUBMISSION
    // ==========================================================================

    /// Start from a search hit: select the field and, when it belongs to that
    /// field, the doctor. The stage never moves forward.
    pub async fn prefill(&mut self, field_id: i64, doctor_id: Option<i64>) -> Result<(), WizardError> {
        if self.fields.is_empty() {
            self.load_fields().await?;
        }
        self.select_field(field_id)?;
        self.load_doctors().await?;

        if let Some(doctor_id) = doctor_id {
            self.select_doctor(doctor_id)?;
        }

        info!("Booking session {} prefilled with field {} doctor {:?}", self.session_id, field_id, doctor_id);
        Ok(())
    }

    /// Create the appointment. Re-checks the temporal policy against the
    /// current clock; a second call while one is outstanding is refused.
    /// On failure the wizard state is left as it was so the user can retry.
    pub async fn submit(&self) -> Result<AppointmentRef, WizardError> {
        if self.state.stage != WizardStage::Confirm {
            return Err(WizardError::WrongStage(self.state.stage));
        }

        let Some(_in_flight) = InFlight::acquire(&self.submitting) else {
            warn!("Booking session {}: submission already in flight", self.session_id);
            return Err(WizardError::SubmissionInFlight);
        };

        let (Some(doctor_id), Some(date)) = (self.state.selected_doctor_id, self.state.selected_date) else {
            return Err(WizardError::MissingSelection("Please select a doctor and a date"));
        };

        let timestamp = self.pending_timestamp().ok_or(WizardError::InvalidTimestamp)?;
        self.guard.check_schedule(&date, self.state.selected_slot.as_ref())?;

        info!("Booking session {} submitting appointment with doctor {} at {}",
              self.session_id, doctor_id, timestamp);

        let appointment = self
            .store
            .create_appointment(doctor_id, timestamp, self.state.notes.clone())
            .await
            .map_err(|e| {
                error!("Booking session {} submission failed: {}", self.session_id, e);
                WizardError::Submission(e)
            })?;

        info!("Booking session {} created appointment {}", self.session_id, appointment.id);
        Ok(appointment)
    }
}
