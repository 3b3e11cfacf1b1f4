// libs/scheduling-cell/src/services/mod.rs
pub mod appointments;
pub mod codec;
pub mod input;
pub mod policy;
pub mod reschedule;
pub mod search;
pub mod store;
pub mod wizard;
