//! # Conversion Dispatcher
//!
//! Maps a target-type token to the [`Emitter`] that renders a compiled query
//! for that backend. Exactly one emitter runs per request.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use zql_core::Database;

use super::{GatewayError, Payload, QueryCompiler};
use crate::config::{Config, InfluxConfig, MongoConfig};

/// Backends a query can be converted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    MongoDb,
    InfluxDb,
    Elasticsearch,
}

impl TargetType {
    pub const ALL: [TargetType; 3] = [Self::MongoDb, Self::InfluxDb, Self::Elasticsearch];

    /// The token clients pass in the `type` parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MongoDb => "mongodb",
            Self::InfluxDb => "influxdb",
            Self::Elasticsearch => "elasticsearch",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| GatewayError::UnrecognizedTarget(s.to_string()))
    }
}

/// Renders a compiled query for one backend.
pub trait Emitter<C: QueryCompiler>: Send + Sync {
    fn emit(&self, compiler: &C, compiled: &C::Compiled) -> Result<Payload, C::Error>;
}

/// MongoDB shell query against a fixed database.
pub struct MongoEmitter {
    database: Database,
    collection: String,
}

impl MongoEmitter {
    pub fn new(config: &MongoConfig) -> Self {
        Self {
            database: Database::new(config.database.as_str()),
            collection: config.collection.clone(),
        }
    }
}

impl<C: QueryCompiler> Emitter<C> for MongoEmitter {
    fn emit(&self, compiler: &C, compiled: &C::Compiled) -> Result<Payload, C::Error> {
        compiler
            .emit_mongo(compiled, &self.database, &self.collection)
            .map(Payload::Mongo)
    }
}

pub struct InfluxEmitter {
    measurement: String,
}

impl InfluxEmitter {
    pub fn new(config: &InfluxConfig) -> Self {
        Self {
            measurement: config.measurement.clone(),
        }
    }
}

impl<C: QueryCompiler> Emitter<C> for InfluxEmitter {
    fn emit(&self, compiler: &C, compiled: &C::Compiled) -> Result<Payload, C::Error> {
        compiler
            .emit_influx(compiled, &self.measurement)
            .map(Payload::Influx)
    }
}

pub struct ElasticEmitter;

impl<C: QueryCompiler> Emitter<C> for ElasticEmitter {
    fn emit(&self, compiler: &C, compiled: &C::Compiled) -> Result<Payload, C::Error> {
        compiler.emit_elastic(compiled).map(Payload::Elastic)
    }
}

/// Immutable route table from [`TargetType`] to emitter, built at startup.
pub struct Dispatcher<C: QueryCompiler> {
    emitters: HashMap<TargetType, Box<dyn Emitter<C>>>,
}

impl<C: QueryCompiler> Dispatcher<C> {
    /// A dispatcher with no backends registered.
    pub fn empty() -> Self {
        Self {
            emitters: HashMap::new(),
        }
    }

    /// All three backends, configured from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::empty()
            .with(TargetType::MongoDb, MongoEmitter::new(&config.mongodb))
            .with(TargetType::InfluxDb, InfluxEmitter::new(&config.influxdb))
            .with(TargetType::Elasticsearch, ElasticEmitter)
    }

    pub fn with(mut self, target: TargetType, emitter: impl Emitter<C> + 'static) -> Self {
        self.emitters.insert(target, Box::new(emitter));
        self
    }

    pub fn targets(&self) -> Vec<TargetType> {
        let mut targets: Vec<_> = self.emitters.keys().copied().collect();
        targets.sort_by_key(|t| t.as_str());
        targets
    }

    /// Emit `compiled` for the backend named by `token`. Consumes the query.
    pub fn dispatch(
        &self,
        compiler: &C,
        compiled: C::Compiled,
        token: &str,
    ) -> Result<Payload, GatewayError> {
        let emitter = token
            .parse::<TargetType>()
            .ok()
            .and_then(|target| self.emitters.get(&target))
            .ok_or_else(|| GatewayError::UnrecognizedTarget(token.to_string()))?;

        emitter
            .emit(compiler, &compiled)
            .map_err(|e| GatewayError::Emission(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct StubError(String);

    /// Records which emitter was called and with which arguments.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Recorder {
        fn out(&self, call: String) -> Result<String, StubError> {
            self.calls.lock().unwrap().push(call.clone());
            if self.fail {
                Err(StubError(format!("{} failed", call)))
            } else {
                Ok(call)
            }
        }
    }

    impl QueryCompiler for Recorder {
        type Compiled = String;
        type Error = StubError;

        fn compile(&self, prefix: &str, query: &str) -> Result<String, StubError> {
            Ok(format!("{}{}", prefix, query))
        }

        fn emit_mongo(&self, c: &String, db: &Database, coll: &str) -> Result<String, StubError> {
            self.out(format!("mongo:{}:{}:{}", db.name(), coll, c))
        }

        fn emit_influx(&self, c: &String, measurement: &str) -> Result<String, StubError> {
            self.out(format!("influx:{}:{}", measurement, c))
        }

        fn emit_elastic(&self, c: &String) -> Result<String, StubError> {
            self.out(format!("elastic:{}", c))
        }
    }

    fn dispatcher() -> Dispatcher<Recorder> {
        let mut config = Config::default();
        config.mongodb.collection = "coll".into();
        config.influxdb.measurement = "m".into();
        Dispatcher::from_config(&config)
    }

    #[test]
    fn test_token_round_trip() {
        for t in TargetType::ALL {
            assert_eq!(t.as_str().parse::<TargetType>().unwrap(), t);
        }
        assert!("MongoDB".parse::<TargetType>().is_err());
    }

    #[test]
    fn test_each_target_calls_its_emitter_once() {
        let rec = Recorder::default();
        let d = dispatcher();

        assert_eq!(
            d.dispatch(&rec, "q".into(), "mongodb").unwrap(),
            Payload::Mongo("mongo:dbname:coll:q".into())
        );
        assert_eq!(
            d.dispatch(&rec, "q".into(), "influxdb").unwrap(),
            Payload::Influx("influx:m:q".into())
        );
        assert_eq!(
            d.dispatch(&rec, "q".into(), "elasticsearch").unwrap(),
            Payload::Elastic("elastic:q".into())
        );
        assert_eq!(rec.calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_unknown_target_emits_nothing() {
        let rec = Recorder::default();
        let err = dispatcher().dispatch(&rec, "q".into(), "redis").unwrap_err();
        assert_eq!(err, GatewayError::UnrecognizedTarget("redis".into()));
        assert!(rec.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unregistered_target_is_unrecognized() {
        let rec = Recorder::default();
        let d = Dispatcher::<Recorder>::empty().with(TargetType::Elasticsearch, ElasticEmitter);
        assert_eq!(d.targets(), vec![TargetType::Elasticsearch]);
        assert!(matches!(
            d.dispatch(&rec, "q".into(), "mongodb"),
            Err(GatewayError::UnrecognizedTarget(_))
        ));
    }

    #[test]
    fn test_emitter_error_is_verbatim() {
        let rec = Recorder {
            fail: true,
            ..Default::default()
        };
        let err = dispatcher().dispatch(&rec, "q".into(), "elasticsearch").unwrap_err();
        assert_eq!(err, GatewayError::Emission("elastic:q failed".into()));
        assert_eq!(err.to_string(), "elastic:q failed");
    }
}
