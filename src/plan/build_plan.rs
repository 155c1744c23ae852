use serde::Serialize;
use std::collections::BTreeMap;

use super::component::IdfComponent;
use super::hooks::{ExtraScript, PostBuildHook};
use crate::model::board::{self, Board, BoardError};
use crate::model::config::AppConfig;
use crate::model::platform::Platform;

const COMPONENT_CLASS: &str = "esp_adf::ESPADF";

/// Everything registering the `esp_adf` component contributes to a firmware build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub id: String,
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    pub defines: Vec<String>,
    pub build_options: BTreeMap<String, String>,
    pub sdkconfig: BTreeMap<String, bool>,
    pub platforms: Vec<PlatformRegistration>,
    pub idf_components: Vec<IdfComponent>,
    pub extra_scripts: Vec<ExtraScript>,
    #[serde(skip)]
    post_build: Vec<PostBuildHook>,
}

/// A sub-platform instance parented to the component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformRegistration {
    pub platform: Platform,
    pub class: String,
    pub parent: String,
}

impl BuildPlan {
    /// Validate the configuration and derive the plan.
    pub fn from_config(config: &AppConfig) -> Result<Self, BoardError> {
        board::validate_framework(&config.target.framework)?;

        let board = board::resolve_board(
            config.esp_adf.board.as_deref(),
            config.target.board.as_deref(),
        )?;

        let mut platforms = Vec::new();
        for platform in &config.esp_adf.platforms {
            board::validate_usable_board(board, platform)?;
            platforms.push(PlatformRegistration {
                platform: *platform,
                class: format!("esp_adf::{}", platform.class_name()),
                parent: config.component.id.clone(),
            });
        }

        Ok(Self::assemble(&config.component.id, board, platforms))
    }

    fn assemble(id: &str, board: Option<Board>, platforms: Vec<PlatformRegistration>) -> Self {
        let mut plan = Self {
            id: id.to_string(),
            class: COMPONENT_CLASS.to_string(),
            board: None,
            defines: vec!["USE_ESP_ADF".to_string()],
            build_options: BTreeMap::from([
                ("build_unflags".to_string(), "-Wl,--end-group".to_string()),
                (
                    "board_build.embed_txtfiles".to_string(),
                    "components/dueros_service/duer_profile".to_string(),
                ),
                (
                    "build_src_filter".to_string(),
                    "+<components/esp_adf/button/*>".to_string(),
                ),
            ]),
            sdkconfig: BTreeMap::new(),
            platforms,
            idf_components: vec![IdfComponent::esp_adf(), IdfComponent::esp_dsp()],
            extra_scripts: Vec::new(),
            post_build: Vec::new(),
        };

        if let Some(board) = board {
            plan.board = Some(board.name().to_string());
            plan.defines.push("USE_ESP_ADF_BOARD".to_string());
            plan.sdkconfig
                .insert(board.sdkconfig_option().to_string(), true);
            plan.extra_scripts
                .push(ExtraScript::pre("apply_adf_patches.py"));

            let hook = PostBuildHook::EnsureMediaPlayer;
            plan.extra_scripts.push(hook.script());
            plan.post_build.push(hook);
        }

        plan
    }

    /// Hooks to run once the main build has generated the project tree.
    pub fn post_build_hooks(&self) -> &[PostBuildHook] {
        &self.post_build
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
