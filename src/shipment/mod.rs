pub mod manual;
pub mod store;
pub mod types;

pub use manual::manual_status;
pub use store::Store;
pub use types::{is_valid_tracking_number, StatusCode, StatusEvent, TrackedShipment};
