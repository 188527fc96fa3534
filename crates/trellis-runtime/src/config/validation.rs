//! Configuration validation utilities.

use std::collections::HashSet;

use trellis_router::UriTemplate;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, RouteConfig, TrellisConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &TrellisConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_routes(&config.routes)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.max_files == 0 {
        return Err(ConfigError::validation(
            "logging.max_files must be greater than 0",
        ));
    }

    if let Some(target) = logging.filters.keys().find(|t| t.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Empty log filter target: '{target}'"
        )));
    }

    Ok(())
}

fn validate_routes(routes: &[RouteConfig]) -> ConfigResult<()> {
    let mut seen = HashSet::new();

    for route in routes {
        if route.handler.trim().is_empty() {
            return Err(ConfigError::missing_field("routes.handler"));
        }

        let template =
            UriTemplate::parse(&route.template).map_err(|source| ConfigError::InvalidTemplate {
                template: route.template.clone(),
                source,
            })?;

        // `users` and `/users/` are the same route.
        if !seen.insert((template.segments().to_vec(), route.mode)) {
            return Err(ConfigError::DuplicateRoute {
                template: route.template.clone(),
                mode: route.mode,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use trellis_router::RoutingMode;

    fn with_routes(routes: Vec<RouteConfig>) -> TrellisConfig {
        TrellisConfig {
            routes,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&TrellisConfig::default()).is_ok());
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = TrellisConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.logging.file_path = Some(PathBuf::from("/tmp/trellis.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_handler_name() {
        let config = with_routes(vec![RouteConfig::new("users", RoutingMode::Equals, " ")]);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_bad_template() {
        let config = with_routes(vec![RouteConfig::new("users/{", RoutingMode::Equals, "users")]);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_duplicate_routes() {
        let config = with_routes(vec![
            RouteConfig::new("users", RoutingMode::StartsWith, "a"),
            RouteConfig::new("users", RoutingMode::Equals, "b"),
            RouteConfig::new("/users/", RoutingMode::StartsWith, "c"),
        ]);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::DuplicateRoute { mode: RoutingMode::StartsWith, .. })
        ));
    }
}
