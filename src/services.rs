pub mod auth_service;
pub use auth_service::AuthService;
pub mod booking_service;
pub use booking_service::BookingService;
pub mod lead_service;
pub use lead_service::LeadService;
pub mod reminder_service;
pub use reminder_service::ReminderService;
