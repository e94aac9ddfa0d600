pub mod auth;
pub mod bookings;
pub mod leads;
pub mod reminders;
