//! src/domain/mod.rs
mod alert;
pub use alert::{AlertEmail, AlertMessage, AlertTemplate};
pub use alert::Error as AlertMessageError;

mod subscriber_email;
pub use subscriber_email::Error as SubscriberEmailError;
pub use subscriber_email::SubscriberEmail;
