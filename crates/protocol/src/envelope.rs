use serde::{Deserialize, Serialize};

/// A payload tagged with the engine channel it was emitted on.
///
/// The `payload` field uses `serde_json::value::RawValue` so a line can be
/// routed by channel before its body is decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub channel: String,
    pub payload: Box<serde_json::value::RawValue>,
}

impl ChannelMessage {
    /// Creates a message for the given channel and payload.
    pub fn new<T: Serialize>(
        channel: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(payload)?;
        Ok(Self {
            channel: channel.into(),
            payload: serde_json::value::RawValue::from_string(json)?,
        })
    }

    /// Deserializes the payload into the given type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(self.payload.get())
    }
}
