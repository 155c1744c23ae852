use anyhow::{Context, Result};
use serde::Serialize;

use crate::model::config::AppConfig;
use crate::stage::{StageOutcome, StagePaths, stage};

/// When an extra build script runs relative to the native build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPhase {
    Pre,
    Post,
}

/// A script the firmware build runs around compilation, named `<phase>:<file>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraScript {
    pub phase: ScriptPhase,
    pub file: String,
}

impl ExtraScript {
    pub fn pre(file: impl Into<String>) -> Self {
        Self {
            phase: ScriptPhase::Pre,
            file: file.into(),
        }
    }

    pub fn post(file: impl Into<String>) -> Self {
        Self {
            phase: ScriptPhase::Post,
            file: file.into(),
        }
    }

    pub fn name(&self) -> String {
        let phase = match self.phase {
            ScriptPhase::Pre => "pre",
            ScriptPhase::Post => "post",
        };
        format!("{phase}:{}", self.file)
    }
}

/// Post-build work this tool performs itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostBuildHook {
    /// Stage the vendor media player sources into the generated project.
    EnsureMediaPlayer,
}

impl PostBuildHook {
    pub fn script(&self) -> ExtraScript {
        match self {
            PostBuildHook::EnsureMediaPlayer => ExtraScript::post("ensure_media_player.py"),
        }
    }

    pub fn run(&self, config: &AppConfig) -> Result<StageOutcome> {
        match self {
            PostBuildHook::EnsureMediaPlayer => {
                let paths = StagePaths::from_config(config)?;
                tracing::debug!(
                    "post-build: staging {} -> {}",
                    paths.source.display(),
                    paths.destination.display()
                );
                stage(&paths.source, &paths.destination).context("ensure_media_player hook failed")
            }
        }
    }
}
