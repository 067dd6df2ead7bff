pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use error::{ConflictSource, ErrorKind, FrontlineError, Result};
pub use types::{AttackId, GeoPoint, NationId};
