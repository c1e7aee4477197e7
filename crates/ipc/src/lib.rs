//! Command and event boundary for Impasto
//!
//! The painting core never reaches for a global bus. The host passes
//! [`CoreCommand`]s in through the session API and receives [`CoreEvent`]s
//! through an [`EventSink`] it supplies at construction.

mod commands;
mod error;
mod input;
mod messages;

pub use commands::*;
pub use error::*;
pub use input::*;
pub use messages::*;

impl CoreCommand {
    pub fn to_json(&self) -> Result<String, IpcError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a command, rejecting out-of-range payloads.
    pub fn from_json(json: &str) -> Result<Self, IpcError> {
        let command: Self = serde_json::from_str(json)?;
        if let CoreCommand::SetProjectionOpacity { opacity } = command {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(IpcError::OutOfRange {
                    field: "opacity",
                    value: opacity,
                });
            }
        }
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_json() {
        let command = CoreCommand::RequestBakeProjection { layer_id: 2 };
        let json = command.to_json().unwrap();
        assert_eq!(json, r#"{"type":"RequestBakeProjection","data":{"layer_id":2}}"#);
        assert_eq!(CoreCommand::from_json(&json).unwrap(), command);
    }

    #[test]
    fn test_unit_command_json() {
        let command = CoreCommand::from_json(r#"{"type":"ClearCurve"}"#).unwrap();
        assert_eq!(command, CoreCommand::ClearCurve);
    }

    #[test]
    fn test_rejects_bad_opacity() {
        let err = CoreCommand::from_json(r#"{"type":"SetProjectionOpacity","data":{"opacity":2.0}}"#)
            .unwrap_err();
        assert!(matches!(err, IpcError::OutOfRange { field: "opacity", .. }));
    }

    #[test]
    fn test_rejects_unknown_command() {
        assert!(CoreCommand::from_json(r#"{"type":"Undo"}"#).is_err());
    }
}
