//! # Response Envelope
//!
//! The `{state, msg, data}` wrapper returned for every request:
//!
//! ```json
//! {"state":"0","msg":"zql converted successfully","data":"SELECT * FROM \"cpu\""}
//! {"state":"1","msg":"query parameter must not be empty","data":null}
//! ```

use serde::Serialize;

use super::GatewayError;

pub const SUCCESS_MESSAGE: &str = "zql converted successfully";
pub const NULL_OUTPUT_MESSAGE: &str = "backend produced no query";

/// Outcome discriminator, `"0"` / `"1"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum State {
    #[serde(rename = "0")]
    Ok,
    #[serde(rename = "1")]
    Error,
}

/// Backend query output carried in `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Mongo(String),
    Influx(String),
    Elastic(String),
    /// Any other JSON shape a future backend may produce.
    Opaque(serde_json::Value),
}

impl Payload {
    /// Whether this payload would serialize as JSON `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Opaque(serde_json::Value::Null))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    state: State,
    msg: String,
    data: Option<Payload>,
}

impl Envelope {
    fn new(state: State, msg: impl Into<String>, data: Option<Payload>) -> Self {
        Self {
            state,
            msg: msg.into(),
            data,
        }
    }

    /// A null payload is not a conversion; it becomes an emission failure.
    pub fn success(data: Payload) -> Self {
        if data.is_null() {
            return Self::failure(&GatewayError::Emission(NULL_OUTPUT_MESSAGE.into()));
        }
        Self::new(State::Ok, SUCCESS_MESSAGE, Some(data))
    }

    pub fn failure(err: &GatewayError) -> Self {
        Self::new(State::Error, err.to_string(), None)
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    pub fn data(&self) -> Option<&Payload> {
        self.data.as_ref()
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl From<Result<Payload, GatewayError>> for Envelope {
    fn from(outcome: Result<Payload, GatewayError>) -> Self {
        match outcome {
            Ok(data) => Self::success(data),
            Err(e) => Self::failure(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_wire_format() {
        let env = Envelope::success(Payload::Mongo("{name:\"test\"}".into()));
        assert_eq!(
            String::from_utf8(env.to_json().unwrap()).unwrap(),
            r#"{"state":"0","msg":"zql converted successfully","data":"{name:\"test\"}"}"#
        );
    }

    #[test]
    fn test_failure_has_null_data() {
        let env = Envelope::failure(&GatewayError::MissingQuery);
        assert_eq!(env.state(), State::Error);
        assert!(env.data().is_none());
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"state": "1", "msg": "query parameter must not be empty", "data": null})
        );
    }

    #[test]
    fn test_verbatim_error_text() {
        let env: Envelope = Err(GatewayError::Emission("influxdb: boom".into())).into();
        assert_eq!(env.message(), "influxdb: boom");
    }

    #[test]
    fn test_null_payload_is_an_emission_failure() {
        let env = Envelope::success(Payload::Opaque(serde_json::Value::Null));
        assert_eq!(env.state(), State::Error);
        assert!(env.data().is_none());
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"state": "1", "msg": "backend produced no query", "data": null})
        );

        let env: Envelope = Ok(Payload::Opaque(serde_json::Value::Null)).into();
        assert_eq!(env.state(), State::Error);
    }

    #[test]
    fn test_opaque_payload_serializes_as_is() {
        let env = Envelope::success(Payload::Opaque(json!({"size": 10})));
        assert_eq!(
            serde_json::to_value(&env).unwrap()["data"],
            json!({"size": 10})
        );
    }
}
