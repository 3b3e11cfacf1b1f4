// libs/scheduling-cell/tests/wizard_test.rs
//
// End-to-end booking sessions against the in-memory store.

mod support;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use tokio_test::{assert_err, assert_ok};

use scheduling_cell::{
    BookingWizard, CalendarDate, ClockTime, InvalidatedSelection, PolicyViolation, WizardError,
    WizardStage,
};
use support::{at, guard_at, InMemoryStore, StoreCall};

// ==============================================================================
// TEST FIXTURES AND UTILITIES
// ==============================================================================

struct TestSetup {
    store: InMemoryStore,
    wizard: BookingWizard,
}

impl TestSetup {
    fn new(store: InMemoryStore) -> Self {
        let (guard, _clock) = guard_at(at(2026, 10, 19, 9, 30));
        let wizard = BookingWizard::new(Arc::new(store.clone()), guard);
        Self { store, wizard }
    }

    async fn to_schedule_stage(&mut self) {
        assert_ok!(self.wizard.load_fields().await);
        assert_ok!(self.wizard.select_field(1));
        assert_ok!(self.wizard.next());
        assert_ok!(self.wizard.load_doctors().await);
        assert_ok!(self.wizard.select_doctor(7));
        assert_ok!(self.wizard.next());
    }

    async fn to_confirm_stage(&mut self, date: &str, time: &str) {
        self.to_schedule_stage().await;
        assert_ok!(self.wizard.type_date(date));
        assert_ok!(self.wizard.blur_date());
        assert_ok!(self.wizard.load_slots().await);
        assert_ok!(self.wizard.type_time(time));
        assert_ok!(self.wizard.blur_time());
        assert_ok!(self.wizard.next());
    }
}

// ==============================================================================
// BOOKING FLOW
// ==============================================================================

#[tokio::test]
async fn test_happy_path_books_local_timestamp() {
    let mut setup = TestSetup::new(InMemoryStore::clinic());
    setup.to_confirm_stage("25/12/2026", "1430").await;

    assert_eq!(setup.wizard.stage(), WizardStage::Confirm);
    assert!(setup.wizard.is_submit_enabled());

    let appointment = setup.wizard.submit().await.unwrap();
    assert_eq!(appointment.appointment_date.as_str(), "2026-12-25T14:30:00");

    let calls = setup.store.calls().await;
    assert!(calls.contains(&StoreCall::Create {
        doctor_id: 7,
        appointment_date: "2026-12-25T14:30:00".to_string(),
        notes: String::new(),
    }));
    assert!(calls.contains(&StoreCall::ListSlots(7, "2026-12-25".to_string())));
}

#[tokio::test]
async fn test_notes_are_sent_with_booking() {
    let mut setup = TestSetup::new(InMemoryStore::clinic());
    setup.to_confirm_stage("26122026", "0900").await;
    setup.wizard.set_notes("Follow-up on blood pressure");

    let appointment = setup.wizard.submit().await.unwrap();
    assert_eq!(appointment.notes.as_deref(), Some("Follow-up on blood pressure"));
}

#[tokio::test]
async fn test_gates_block_each_stage() {
    let mut setup = TestSetup::new(InMemoryStore::clinic());

    assert_matches!(setup.wizard.next(), Err(WizardError::MissingSelection("Please select a medical field")));
    assert_eq!(setup.wizard.stage(), WizardStage::Field);

    assert_ok!(setup.wizard.load_fields().await);
    assert_ok!(setup.wizard.select_field(1));
    assert_ok!(setup.wizard.next());
    assert_matches!(setup.wizard.next(), Err(WizardError::MissingSelection("Please select a doctor")));

    assert_ok!(setup.wizard.load_doctors().await);
    assert_ok!(setup.wizard.select_doctor(7));
    assert_ok!(setup.wizard.next());
    assert_matches!(
        setup.wizard.next(),
        Err(WizardError::MissingSelection("Please select a date and time slot"))
    );
    assert_eq!(setup.wizard.stage(), WizardStage::Schedule);
}

#[tokio::test]
async fn test_doctor_from_other_field_is_refused() {
    let mut setup = TestSetup::new(InMemoryStore::clinic());
    assert_ok!(setup.wizard.load_fields().await);
    assert_ok!(setup.wizard.select_field(1));
    assert_ok!(setup.wizard.load_doctors().await);

    assert_matches!(
        setup.wizard.select_doctor(9),
        Err(WizardError::UnknownOption { kind: "doctor", id: 9 })
    );
}

// ==============================================================================
// INVALIDATION AND TEMPORAL POLICY
// ==============================================================================

#[tokio::test]
async fn test_changing_field_drops_everything_after_it() {
    let mut setup = TestSetup::new(InMemoryStore::clinic());
    setup.to_confirm_stage("25122026", "1030").await;

    setup.wizard.back();
    setup.wizard.back();
    let dropped = setup.wizard.select_field(2).unwrap();
    assert_eq!(
        dropped,
        vec![
            InvalidatedSelection::Doctor,
            InvalidatedSelection::DoctorOptions,
            InvalidatedSelection::Date,
            InvalidatedSelection::Slot,
            InvalidatedSelection::SlotOptions,
        ]
    );
    assert_eq!(setup.wizard.state().selected_date, None);
    assert_eq!(setup.wizard.state().selected_slot, None);
    assert_eq!(setup.wizard.date_input().text(), "");
}

#[tokio::test]
async fn test_changing_field_at_confirm_returns_to_doctor_stage() {
    let mut setup = TestSetup::new(InMemoryStore::clinic());
    setup.to_confirm_stage("25122026", "1430").await;

    assert_ok!(setup.wizard.select_field(2));
    assert_eq!(setup.wizard.stage(), WizardStage::Doctor);
    assert_eq!(setup.wizard.state().selected_doctor_id, None);
    assert!(!setup.wizard.is_submit_enabled());
    assert_matches!(
        setup.wizard.submit().await,
        Err(WizardError::WrongStage(WizardStage::Doctor))
    );

    assert_ok!(setup.wizard.load_doctors().await);
    assert_ok!(setup.wizard.select_doctor(9));
    assert_eq!(setup.wizard.next().unwrap(), WizardStage::Schedule);
}

#[tokio::test]
async fn test_new_date_at_confirm_returns_to_schedule_stage() {
    let mut setup = TestSetup::new(InMemoryStore::clinic());
    setup.to_confirm_stage("25122026", "1430").await;

    assert_ok!(setup.wizard.enter_date(CalendarDate::new(2026, 12, 26).unwrap()));
    assert_eq!(setup.wizard.stage(), WizardStage::Schedule);
    assert_eq!(setup.wizard.state().selected_slot, None);
    assert_eq!(setup.wizard.pending_timestamp(), None);
    assert!(!setup.wizard.is_submit_enabled());
}

#[tokio::test]
async fn test_typed_past_date_is_rejected_and_cleared() {
    let mut setup = TestSetup::new(InMemoryStore::clinic());
    setup.to_schedule_stage().await;

    let result = setup.wizard.type_date("18102026");
    assert_matches!(result, Err(WizardError::TemporalPolicy(PolicyViolation::PastDate)));
    assert_eq!(setup.wizard.date_input().text(), "");
    assert_eq!(setup.wizard.state().selected_date, None);
    assert_eq!(
        setup.wizard.error(),
        Some("Cannot select a past date. Please choose a future date.")
    );
}

#[tokio::test]
async fn test_partial_date_clears_on_blur() {
    let mut setup = TestSetup::new(InMemoryStore::clinic());
    setup.to_schedule_stage().await;

    assert_ok!(setup.wizard.type_date("2512"));
    assert_eq!(setup.wizard.date_input().text(), "25/12");
    assert_ok!(setup.wizard.blur_date());
    assert_eq!(setup.wizard.date_input().text(), "");
    assert_eq!(setup.wizard.state().selected_date, None);
}

#[tokio::test]
async fn test_clock_moving_past_slot_blocks_submit() {
    let store = InMemoryStore::clinic();
    let (guard, clock) = guard_at(at(2026, 10, 19, 8, 0));
    let mut wizard = BookingWizard::new(Arc::new(store.clone()), guard);

    assert_ok!(wizard.load_fields().await);
    assert_ok!(wizard.select_field(1));
    assert_ok!(wizard.next());
    assert_ok!(wizard.load_doctors().await);
    assert_ok!(wizard.select_doctor(7));
    assert_ok!(wizard.next());
    assert_ok!(wizard.enter_date(CalendarDate::new(2026, 10, 19).unwrap()));
    assert_ok!(wizard.load_slots().await);
    assert_ok!(wizard.select_slot(ClockTime::new(9, 0).unwrap()));
    assert_ok!(wizard.next());

    clock.set(at(2026, 10, 19, 9, 0));
    let err = assert_err!(wizard.submit().await);
    assert_eq!(err, WizardError::TemporalPolicy(PolicyViolation::PastInstant));
    assert!(!store.calls().await.iter().any(|c| matches!(c, StoreCall::Create { .. })));
}

// ==============================================================================
// SUBMISSION
// ==============================================================================

#[tokio::test]
async fn test_second_submit_while_in_flight_is_refused() {
    let store = InMemoryStore::clinic().with_submit_delay(Duration::from_millis(50));
    let mut setup = TestSetup::new(store);
    setup.to_confirm_stage("25122026", "1430").await;

    let (first, second) = tokio::join!(setup.wizard.submit(), setup.wizard.submit());
    assert_ok!(first);
    assert_matches!(second, Err(WizardError::SubmissionInFlight));

    let creates = setup
        .store
        .calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, StoreCall::Create { .. }))
        .count();
    assert_eq!(creates, 1);
    assert!(!setup.wizard.is_submitting());
}

#[tokio::test]
async fn test_rejected_booking_keeps_selections_for_retry() {
    let mut setup = TestSetup::new(InMemoryStore::clinic());
    setup.to_confirm_stage("25122026", "1430").await;
    setup.store.reject_bookings_with("Time slot is already booked").await;

    let err = setup.wizard.submit().await.unwrap_err();
    assert_eq!(err.to_string(), "Time slot is already booked");
    assert_eq!(setup.wizard.stage(), WizardStage::Confirm);
    assert_eq!(setup.wizard.state().selected_doctor_id, Some(7));
    assert!(setup.wizard.is_submit_enabled());
}

// ==============================================================================
// PREFILL
// ==============================================================================

#[tokio::test]
async fn test_prefill_from_search_hit() {
    let mut setup = TestSetup::new(InMemoryStore::clinic());

    assert_ok!(setup.wizard.prefill(1, Some(7)).await);
    assert_eq!(setup.wizard.stage(), WizardStage::Field);
    assert_eq!(setup.wizard.state().selected_field_id, Some(1));
    assert_eq!(setup.wizard.state().selected_doctor_id, Some(7));

    assert_eq!(setup.wizard.next().unwrap(), WizardStage::Doctor);
    assert_eq!(setup.wizard.next().unwrap(), WizardStage::Schedule);
}

#[tokio::test]
async fn test_prefill_with_mismatched_doctor_fails() {
    let mut setup = TestSetup::new(InMemoryStore::clinic());
    assert_matches!(
        setup.wizard.prefill(1, Some(9)).await,
        Err(WizardError::UnknownOption { kind: "doctor", .. })
    );
    assert_eq!(setup.wizard.state().selected_field_id, Some(1));
    assert_eq!(setup.wizard.state().selected_doctor_id, None);
}
