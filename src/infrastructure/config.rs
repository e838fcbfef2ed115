use serde::Deserialize;

const CONFIG_FILE: &str = "config/dashboard";
const ENV_PREFIX: &str = "DASHBOARD";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(default)]
    pub refresh: RefreshSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DashboardSettings {
    /// Document to load when no path is given on the command line.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshSettings {
    /// Overrides the document's own `refresh` when set.
    pub interval: Option<String>,
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: None,
            bus_capacity: default_bus_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_bus_capacity() -> usize {
    16
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Load `config/dashboard.{toml,json,yaml}` (optional), overridden by
/// `DASHBOARD__SECTION__KEY` environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(CONFIG_FILE).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn parse_app_config(toml: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_app_config() {
        let toml = r#"
            [dashboard]
            path = "dashboards/home.json"

            [refresh]
            interval = "30s"
            bus_capacity = 4

            [logging]
            filter = "dashboard_srv=debug"
        "#;
        let config = parse_app_config(toml).unwrap();

        assert_eq!(config.dashboard.path.as_deref(), Some("dashboards/home.json"));
        assert_eq!(config.refresh.interval.as_deref(), Some("30s"));
        assert_eq!(config.refresh.bus_capacity, 4);
        assert_eq!(config.logging.filter, "dashboard_srv=debug");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = parse_app_config("").unwrap();

        assert_eq!(config.dashboard.path, None);
        assert_eq!(config.refresh.interval, None);
        assert_eq!(config.refresh.bus_capacity, 16);
        assert_eq!(config.logging.filter, "info");
    }
}
