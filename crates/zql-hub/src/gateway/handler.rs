//! # Gateway Handler
//!
//! Runs one conversion: `Validating → Compiling → Dispatching → Serializing`.
//! Any failure before serialization jumps straight to an error envelope.

use std::collections::HashMap;

use super::{validator, Dispatcher, Envelope, GatewayError, Payload, QueryCompiler};

/// Pipeline stages, used to label failures in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Compiling,
    Dispatching,
    Serializing,
}

/// A compiler plus its dispatch table. Shared read-only across requests.
pub struct Gateway<C: QueryCompiler> {
    compiler: C,
    dispatcher: Dispatcher<C>,
}

impl<C: QueryCompiler> Gateway<C> {
    pub fn new(compiler: C, dispatcher: Dispatcher<C>) -> Self {
        Self {
            compiler,
            dispatcher,
        }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Convert one request into its envelope.
    pub fn convert(&self, params: &HashMap<String, String>) -> Envelope {
        match self.run(params) {
            Ok(payload) => {
                tracing::debug!("Conversion succeeded");
                Envelope::success(payload)
            }
            Err(e) => {
                tracing::debug!(stage = ?e.stage(), error = %e, "Conversion failed");
                Envelope::failure(&e)
            }
        }
    }

    /// Convert one request into the response body.
    ///
    /// A serialization fault is logged and yields an empty body.
    pub fn respond(&self, params: &HashMap<String, String>) -> Vec<u8> {
        let envelope = self.convert(params);
        match envelope.to_json() {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(stage = ?Stage::Serializing, "Failed to encode envelope: {}", e);
                Vec::new()
            }
        }
    }

    fn run(&self, params: &HashMap<String, String>) -> Result<Payload, GatewayError> {
        let request = validator::validate(params)?;
        tracing::debug!(
            target_type = %request.target_type,
            prefix = %request.prefix,
            "Compiling query"
        );

        let compiled = self
            .compiler
            .compile(&request.prefix, &request.query)
            .map_err(|e| GatewayError::Compilation(e.to_string()))?;

        self.dispatcher
            .dispatch(&self.compiler, compiled, &request.target_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::gateway::{State, ZqlCompiler};

    fn gateway() -> Gateway<ZqlCompiler> {
        Gateway::new(ZqlCompiler, Dispatcher::from_config(&Config::default()))
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_mongodb_conversion() {
        let env = gateway().convert(&params(&[
            ("type", "mongodb"),
            ("zql", "SELECT * FROM users WHERE name = 'test'"),
        ]));
        assert_eq!(env.state(), State::Ok);
        assert_eq!(
            env.data(),
            Some(&Payload::Mongo(
                r#"db.getSiblingDB("dbname").getCollection("users").find({"name":"test"})"#.into()
            ))
        );
    }

    #[test]
    fn test_influxdb_conversion_with_prefix() {
        let env = gateway().convert(&params(&[
            ("type", "influxdb"),
            ("zql", "SELECT * FROM cpu LIMIT 1"),
            ("prefix", "edge_"),
        ]));
        assert_eq!(
            env.data(),
            Some(&Payload::Influx(r#"SELECT * FROM "edge_cpu" LIMIT 1"#.into()))
        );
    }

    #[test]
    fn test_compile_error_is_reported() {
        let env = gateway().convert(&params(&[("type", "elasticsearch"), ("zql", "a = 'x")]));
        assert_eq!(env.state(), State::Error);
        assert_eq!(
            env.message(),
            "unterminated string literal starting at byte 4"
        );
        assert!(env.data().is_none());
    }

    #[test]
    fn test_emission_error_is_reported() {
        let env = gateway().convert(&params(&[
            ("type", "influxdb"),
            ("zql", "SELECT * FROM cpu ORDER BY host"),
        ]));
        assert_eq!(env.state(), State::Error);
        assert_eq!(
            env.message(),
            "influxdb: ORDER BY is only supported on time, not 'host'"
        );
    }

    #[test]
    fn test_respond_is_deterministic() {
        let gw = gateway();
        let p = params(&[("type", "elasticsearch"), ("zql", "a = 1 AND b = 2")]);
        assert_eq!(gw.respond(&p), gw.respond(&p));
    }
}
