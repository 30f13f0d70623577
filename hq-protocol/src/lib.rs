pub mod clock;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod grammar;
pub mod identity;
pub mod position;
pub mod transport;

pub use clock::{Clock, FixedClock, SystemClock};
pub use decoder::HqDecoder;
pub use error::{HqError, Result};
pub use identity::{DeviceId, DeviceRegistry, DeviceResolver};
pub use position::{Alarm, CellTowerInfo, PositionRecord};
pub use transport::{NoReply, ReplyTransport};
