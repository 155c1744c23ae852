use std::fmt;

use thiserror::Error;

/// Boards the ESP-ADF SDK ships a board configuration for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    name: &'static str,
    sdkconfig_option: &'static str,
}

pub const SUPPORTED_BOARDS: &[Board] = &[
    Board::new("esp32s3box", "CONFIG_ESP32_S3_BOX_BOARD"),
    Board::new("esp32s3boxlite", "CONFIG_ESP32_S3_BOX_LITE_BOARD"),
    Board::new("esp32s3box3", "CONFIG_ESP32_S3_BOX_3_BOARD"),
    Board::new("esp32s3korvo1", "CONFIG_ESP32_S3_KORVO1_BOARD"),
    Board::new("esp32korvo1", "CONFIG_ESP32_KORVO1_BOARD"),
];

/// Framework the component requires.
pub const REQUIRED_FRAMEWORK: &str = "esp-idf";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("Board {board} is not supported by esp-adf {platform}")]
    Unsupported { board: String, platform: String },

    #[error("esp-adf requires the esp-idf framework, found {0}")]
    Framework(String),
}

impl Board {
    const fn new(name: &'static str, sdkconfig_option: &'static str) -> Self {
        Self {
            name,
            sdkconfig_option,
        }
    }

    pub fn lookup(name: &str) -> Option<Board> {
        SUPPORTED_BOARDS.iter().copied().find(|b| b.name == name)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn sdkconfig_option(&self) -> &'static str {
        self.sdkconfig_option
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Pick the board for the component.
///
/// An explicit board must be in [`SUPPORTED_BOARDS`]. Without one, the
/// target's hardware board is adopted only when it is itself supported;
/// any other target board leaves the component board-less.
pub fn resolve_board(
    explicit: Option<&str>,
    target_board: Option<&str>,
) -> Result<Option<Board>, BoardError> {
    if let Some(name) = explicit {
        return Board::lookup(name)
            .map(Some)
            .ok_or_else(|| BoardError::Unsupported {
                board: name.to_string(),
                platform: "component".to_string(),
            });
    }

    Ok(target_board.and_then(Board::lookup))
}

/// Check that a platform can be used with the resolved board.
///
/// No board at all is reported as board `None`.
pub fn validate_usable_board(
    board: Option<Board>,
    platform: impl fmt::Display,
) -> Result<Board, BoardError> {
    board.ok_or_else(|| BoardError::Unsupported {
        board: "None".to_string(),
        platform: platform.to_string(),
    })
}

pub fn validate_framework(framework: &str) -> Result<(), BoardError> {
    if framework == REQUIRED_FRAMEWORK {
        Ok(())
    } else {
        Err(BoardError::Framework(framework.to_string()))
    }
}
