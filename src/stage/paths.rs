use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::model::config::AppConfig;

/// Where a vendor component tree lives and where the generated project expects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePaths {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl StagePaths {
    /// `<wd>/components/<ns>/<component>` staged into
    /// `<wd>/src/<project_ns>/components/<ns>/<component>`.
    pub fn from_convention(
        working_dir: &Path,
        namespace: &str,
        project_namespace: &str,
        component: &str,
    ) -> Self {
        let source = working_dir
            .join("components")
            .join(namespace)
            .join(component);
        let destination = working_dir
            .join("src")
            .join(project_namespace)
            .join("components")
            .join(namespace)
            .join(component);

        Self {
            source,
            destination,
        }
    }

    /// Media player paths for the configured working directory and namespaces.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let component = &config.component;
        Ok(Self::from_convention(
            &config.working_dir()?,
            &component.namespace,
            &component.project_namespace,
            &component.media_player,
        ))
    }

    pub fn with_overrides(mut self, source: Option<PathBuf>, destination: Option<PathBuf>) -> Self {
        if let Some(source) = source {
            self.source = source;
        }
        if let Some(destination) = destination {
            self.destination = destination;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convention_builds_media_player_paths() {
        let paths = StagePaths::from_convention(
            Path::new("/work"),
            "esp_adf",
            "esphome",
            "media_player",
        );

        assert_eq!(
            paths.source,
            PathBuf::from("/work/components/esp_adf/media_player")
        );
        assert_eq!(
            paths.destination,
            PathBuf::from("/work/src/esphome/components/esp_adf/media_player")
        );
    }

    #[test]
    fn overrides_replace_only_given_paths() {
        let paths = StagePaths::from_convention(Path::new("fw"), "esp_adf", "esphome", "media_player")
            .with_overrides(Some(PathBuf::from("vendor/mp")), None);

        assert_eq!(paths.source, PathBuf::from("vendor/mp"));
        assert_eq!(
            paths.destination,
            PathBuf::from("fw/src/esphome/components/esp_adf/media_player")
        );
    }
}
