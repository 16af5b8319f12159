pub mod channel;
pub mod decode;

pub use channel::{AlertChannel, ChannelStatus};
pub use decode::{decode_alert, on_alert_message, AlertSource, DecodedAlert};
