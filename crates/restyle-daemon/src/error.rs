use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Map a configuration field path like `server.port` to the environment
/// variable that sets it.
pub fn to_env_var(field: &str) -> String {
    format!("RESTYLE_{}", field.replace('.', "__").to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("server.port"), "RESTYLE_SERVER__PORT");
        assert_eq!(to_env_var("gemini.model"), "RESTYLE_GEMINI__MODEL");
    }
}
