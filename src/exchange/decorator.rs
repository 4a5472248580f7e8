//! Request decoration hooks passed into venue clients at construction.

use std::sync::Arc;

/// Adjusts the query of an outgoing request before it is signed.
pub trait RequestDecorator: Send + Sync {
    fn decorate(&self, path: &str, params: &mut Vec<(String, String)>);
}

/// Appends `key=value` to requests whose path contains a filter string.
///
/// An existing `key` is left untouched.
#[derive(Debug, Clone)]
pub struct QueryParamDecorator {
    path_contains: String,
    key: String,
    value: String,
}

impl QueryParamDecorator {
    pub fn new(
        path_contains: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            path_contains: path_contains.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

impl RequestDecorator for QueryParamDecorator {
    fn decorate(&self, path: &str, params: &mut Vec<(String, String)>) {
        if !path.contains(&self.path_contains) {
            return;
        }
        if params.iter().any(|(k, _)| k == &self.key) {
            return;
        }
        params.push((self.key.clone(), self.value.clone()));
    }
}

/// Run every decorator in order.
pub fn apply_decorators(
    decorators: &[Arc<dyn RequestDecorator>],
    path: &str,
    params: &mut Vec<(String, String)>,
) {
    for decorator in decorators {
        decorator.decorate(path, params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_matching_paths_are_decorated() {
        let decorators: Vec<Arc<dyn RequestDecorator>> = vec![Arc::new(
            QueryParamDecorator::new("/auth", "token_usage", "interactive"),
        )];

        let mut auth = vec![];
        apply_decorators(&decorators, "/v1/auth", &mut auth);
        assert_eq!(
            auth,
            vec![("token_usage".to_string(), "interactive".to_string())]
        );

        let mut order = vec![("symbol".to_string(), "BTCUSDT".to_string())];
        apply_decorators(&decorators, "/fapi/v1/order", &mut order);
        assert_eq!(order.len(), 1);
    }

    #[test]
    fn test_existing_key_is_kept() {
        let decorator = QueryParamDecorator::new("/fapi/", "recvWindow", "5000");
        let mut params = vec![("recvWindow".to_string(), "10000".to_string())];
        decorator.decorate("/fapi/v1/order", &mut params);
        assert_eq!(params, vec![("recvWindow".to_string(), "10000".to_string())]);
    }
}
