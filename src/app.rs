use std::io::Write;

use anyhow::{Context, Result};

use crate::cli::{Command, USAGE};
use crate::model::board::SUPPORTED_BOARDS;
use crate::model::config::AppConfig;
use crate::plan::BuildPlan;
use crate::stage::{StagePaths, stage};

pub struct App {
    pub config: AppConfig,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run one command, writing its report to `out`. Diagnostics go through `tracing`.
    pub fn run(&self, command: &Command, out: &mut impl Write) -> Result<()> {
        match command {
            Command::Stage {
                source,
                destination,
            } => {
                let paths = StagePaths::from_config(&self.config)?
                    .with_overrides(source.clone(), destination.clone());
                let outcome = stage(&paths.source, &paths.destination)
                    .with_context(|| format!("staging {}", paths.source.display()))?;
                if outcome.is_staged() {
                    writeln!(out, "{outcome}")?;
                }
            }
            Command::PostBuild => {
                let plan = self.plan()?;
                let hooks = plan.post_build_hooks();
                if hooks.is_empty() {
                    tracing::info!("no esp-adf board configured, no post-build hooks scheduled");
                }

                for hook in hooks {
                    tracing::debug!("running post-build hook {}", hook.script().name());
                    let outcome = hook.run(&self.config)?;
                    if outcome.is_staged() {
                        writeln!(out, "{outcome}")?;
                    }
                }
            }
            Command::Plan => {
                let plan = self.plan()?;
                write!(out, "{}", plan.to_toml().context("rendering build plan")?)?;
            }
            Command::Validate => {
                let plan = self.plan()?;
                match plan.board.as_deref() {
                    Some(board) => writeln!(out, "board: {board}")?,
                    None => writeln!(out, "board: none")?,
                }
                for registration in &plan.platforms {
                    writeln!(out, "platform: {} ({})", registration.platform, registration.class)?;
                }
                writeln!(out, "ok")?;
            }
            Command::Boards => {
                for board in SUPPORTED_BOARDS {
                    writeln!(out, "{:<16} {}", board.name(), board.sdkconfig_option())?;
                }
            }
            Command::Help => writeln!(out, "{USAGE}")?,
        }

        Ok(())
    }

    fn plan(&self) -> Result<BuildPlan> {
        BuildPlan::from_config(&self.config).context("invalid esp_adf configuration")
    }
}
