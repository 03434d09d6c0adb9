//! Request parameter extraction.

use std::collections::HashMap;

use super::GatewayError;

pub const TYPE_PARAM: &str = "type";
pub const QUERY_PARAM: &str = "zql";
pub const PREFIX_PARAM: &str = "prefix";

/// Parameters of a `/convert` request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    pub target_type: String,
    pub query: String,
    /// Table prefix, empty when not supplied.
    pub prefix: String,
}

/// Check the raw query-string parameters. The first failing rule wins.
pub fn validate(params: &HashMap<String, String>) -> Result<RequestParams, GatewayError> {
    let get = |key: &str| params.get(key).map(String::as_str).unwrap_or_default();

    let target_type = get(TYPE_PARAM);
    if target_type.is_empty() {
        return Err(GatewayError::MissingTargetType);
    }
    let query = get(QUERY_PARAM);
    if query.is_empty() {
        return Err(GatewayError::MissingQuery);
    }

    Ok(RequestParams {
        target_type: target_type.to_string(),
        query: query.to_string(),
        prefix: get(PREFIX_PARAM).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_valid_request() {
        let p = validate(&params(&[("type", "mongodb"), ("zql", "a=1"), ("prefix", "t_")]))
            .unwrap();
        assert_eq!(
            p,
            RequestParams {
                target_type: "mongodb".into(),
                query: "a=1".into(),
                prefix: "t_".into(),
            }
        );
    }

    #[test]
    fn test_prefix_defaults_to_empty() {
        let p = validate(&params(&[("type", "influxdb"), ("zql", "a=1")])).unwrap();
        assert_eq!(p.prefix, "");
    }

    #[test]
    fn test_missing_type_wins_over_missing_query() {
        assert_eq!(
            validate(&HashMap::new()),
            Err(GatewayError::MissingTargetType)
        );
        assert_eq!(
            validate(&params(&[("type", ""), ("zql", "a=1")])),
            Err(GatewayError::MissingTargetType)
        );
    }

    #[test]
    fn test_missing_query() {
        assert_eq!(
            validate(&params(&[("type", "mongodb")])),
            Err(GatewayError::MissingQuery)
        );
    }

    #[test]
    fn test_unknown_type_is_not_a_validation_error() {
        assert!(validate(&params(&[("type", "redis"), ("zql", "a=1")])).is_ok());
    }
}
