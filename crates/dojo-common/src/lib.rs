pub mod errors;
pub mod events;
pub mod id;
pub mod notifications;
pub mod route;
pub mod service;

pub use errors::{ConfigError, DojoError};
pub use events::{Event, EventBus};
pub use id::{new_correlation_id, ChallengeRef};
pub use notifications::{Notification, NotificationLevel, NotificationQueue};
pub use route::Route;
pub use service::Service;

pub type Result<T> = std::result::Result<T, DojoError>;
