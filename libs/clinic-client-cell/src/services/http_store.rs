// libs/clinic-client-cell/src/services/http_store.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use scheduling_cell::{
    AppointmentFilter, AppointmentRef, BookingRequest, CalendarDate, ClockTime, Doctor,
    LocalTimestamp, MedicalField, SchedulingStore, SearchResults, StoreError,
};
use shared_config::AppConfig;
use shared_http::{ApiClient, ApiError};
use shared_models::SessionContext;

/// `SchedulingStore` over the clinic REST API.
pub struct HttpSchedulingStore {
    api: ApiClient,
    session: Arc<SessionContext>,
}

impl HttpSchedulingStore {
    pub fn new(config: &AppConfig, session: Arc<SessionContext>) -> Self {
        Self {
            api: ApiClient::new(config),
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    async fn call<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let token = self.session.bearer_token().await;

        match self.api.request::<T>(method, path, token.as_deref(), body).await {
            Ok(value) => Ok(value),
            Err(err) => {
                let store_err = classify(&err);
                if store_err == StoreError::Unauthorized {
                    warn!("Clinic API rejected the session token");
                    self.session.invalidate().await;
                }
                Err(store_err)
            }
        }
    }
}

/// Map a client failure onto the store's error kinds.
fn classify(err: &anyhow::Error) -> StoreError {
    if let Some(api) = err.downcast_ref::<ApiError>() {
        return if api.is_unauthorized() {
            StoreError::Unauthorized
        } else if api.is_not_found() {
            StoreError::NotFound(api.message.clone())
        } else {
            StoreError::Rejected(api.message.clone())
        };
    }

    match err.downcast_ref::<reqwest::Error>() {
        Some(e) if e.is_decode() => StoreError::Decode(e.to_string()),
        Some(e) => StoreError::Transport(e.to_string()),
        None => StoreError::Transport(err.to_string()),
    }
}

fn appointments_path(filter: AppointmentFilter) -> &'static str {
    match filter {
        AppointmentFilter::All => "/appointments",
        AppointmentFilter::Upcoming => "/appointments/upcoming",
        AppointmentFilter::Past => "/appointments/past",
    }
}

#[async_trait]
impl SchedulingStore for HttpSchedulingStore {
    async fn list_medical_fields(&self) -> Result<Vec<MedicalField>, StoreError> {
        self.call(Method::GET, "/medical-fields", None).await
    }

    async fn list_doctors(&self, field_id: i64) -> Result<Vec<Doctor>, StoreError> {
        let path = format!("/doctors?fieldId={}", field_id);
        self.call(Method::GET, &path, None).await
    }

    async fn list_available_slots(&self, doctor_id: i64, date: CalendarDate) -> Result<Vec<ClockTime>, StoreError> {
        let path = format!("/time-slots?doctorId={}&date={}", doctor_id, date);
        let slots: Vec<ClockTime> = self.call(Method::GET, &path, None).await?;
        debug!("Doctor {} has {} open slots on {}", doctor_id, slots.len(), date);
        Ok(slots)
    }

    async fn create_appointment(
        &self,
        doctor_id: i64,
        appointment_date: LocalTimestamp,
        notes: String,
    ) -> Result<AppointmentRef, StoreError> {
        let request = BookingRequest { doctor_id, appointment_date, notes };
        let body = serde_json::to_value(&request).map_err(|e| StoreError::Decode(e.to_string()))?;
        self.call(Method::POST, "/appointments", Some(body)).await
    }

    async fn reschedule_appointment(
        &self,
        appointment_id: i64,
        new_date: LocalTimestamp,
    ) -> Result<AppointmentRef, StoreError> {
        let path = format!("/appointments/{}/reschedule", appointment_id);
        self.call(Method::PUT, &path, Some(json!({ "newDate": new_date.as_str() }))).await
    }

    async fn cancel_appointment(&self, appointment_id: i64) -> Result<(), StoreError> {
        let path = format!("/appointments/{}/cancel", appointment_id);
        let _: Value = self.call(Method::PUT, &path, None).await?;
        Ok(())
    }

    async fn list_appointments(&self, filter: AppointmentFilter) -> Result<Vec<AppointmentRef>, StoreError> {
        self.call(Method::GET, appointments_path(filter), None).await
    }

    async fn search_directory(&self, query: String) -> Result<SearchResults, StoreError> {
        let path = format!("/search?q={}", urlencoding::encode(&query));
        self.call(Method::GET, &path, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_errors_map_to_store_errors() {
        let unauthorized = anyhow::Error::new(ApiError { status: 401, message: "expired".to_string() });
        assert_eq!(classify(&unauthorized), StoreError::Unauthorized);

        let missing = anyhow::Error::new(ApiError { status: 404, message: "Appointment not found".to_string() });
        assert_eq!(classify(&missing), StoreError::NotFound("Appointment not found".to_string()));

        let conflict = anyhow::Error::new(ApiError { status: 400, message: "Time slot is already booked".to_string() });
        assert_eq!(classify(&conflict), StoreError::Rejected("Time slot is already booked".to_string()));
    }

    #[test]
    fn test_filter_paths() {
        assert_eq!(appointments_path(AppointmentFilter::All), "/appointments");
        assert_eq!(appointments_path(AppointmentFilter::Upcoming), "/appointments/upcoming");
        assert_eq!(appointments_path(AppointmentFilter::Past), "/appointments/past");
    }
}
