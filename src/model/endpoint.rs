use std::fmt::Formatter;

/// Topic prefix used by stock Sunseeker firmware.
pub const DEFAULT_TOPIC_PREFIX: &str = "device";

/// Manufacturer reported for all bridged mowers.
pub const MANUFACTURER: &str = "Sunseeker";

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("device id must not be empty")]
    EmptyDeviceId,
}

/// Identity of one physical mower on the broker.
///
/// Immutable after creation; the command and response topics are derived
/// from the topic prefix and the device id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceEndpoint {
    device_id: String,
    topic_prefix: String,
}

impl DeviceEndpoint {
    /// Create an endpoint, rejecting an empty (or whitespace-only) device id.
    pub fn new(
        device_id: impl Into<String>,
        topic_prefix: impl Into<Option<String>>,
    ) -> Result<Self, EndpointError> {
        let device_id = device_id.into().trim().to_string();
        if device_id.is_empty() {
            return Err(EndpointError::EmptyDeviceId);
        }

        Ok(Self {
            device_id,
            topic_prefix: topic_prefix
                .into()
                .unwrap_or_else(|| DEFAULT_TOPIC_PREFIX.to_string()),
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Topic the mower listens on for commands.
    pub fn command_topic(&self) -> String {
        format!("/{}/{}/get", self.topic_prefix, self.device_id)
    }

    /// Topic the mower publishes status responses on.
    pub fn response_topic(&self) -> String {
        format!("/{}/{}/update", self.topic_prefix, self.device_id)
    }

    pub fn display_name(&self) -> String {
        format!("Sunseeker Lawn Mower ({})", self.device_id)
    }
}

impl std::fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.device_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_topics() {
        let endpoint = DeviceEndpoint::new("mower-1", None).unwrap();
        assert_eq!(endpoint.command_topic(), "/device/mower-1/get");
        assert_eq!(endpoint.response_topic(), "/device/mower-1/update");

        let endpoint = DeviceEndpoint::new("mower-1", "garden".to_string()).unwrap();
        assert_eq!(endpoint.command_topic(), "/garden/mower-1/get");
        assert_eq!(endpoint.response_topic(), "/garden/mower-1/update");
    }

    #[test]
    fn test_trims_device_id() {
        let endpoint = DeviceEndpoint::new("  mower-1  ", None).unwrap();
        assert_eq!(endpoint.device_id(), "mower-1");
    }

    #[test]
    fn test_rejects_empty_device_id() {
        assert!(matches!(
            DeviceEndpoint::new("", None),
            Err(EndpointError::EmptyDeviceId)
        ));
        assert!(matches!(
            DeviceEndpoint::new("   ", None),
            Err(EndpointError::EmptyDeviceId)
        ));
    }
}
