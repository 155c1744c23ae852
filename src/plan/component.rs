use serde::Serialize;

/// An external ESP-IDF component the firmware build must fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdfComponent {
    pub name: String,
    pub repo: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub submodules: Vec<String>,
}

impl IdfComponent {
    pub fn new(name: impl Into<String>, repo: impl Into<String>, git_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repo: repo.into(),
            git_ref: git_ref.into(),
            path: None,
            components: Vec::new(),
            submodules: Vec::new(),
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn components<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components = components.into_iter().map(Into::into).collect();
        self
    }

    pub fn submodules<I, S>(mut self, submodules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.submodules = submodules.into_iter().map(Into::into).collect();
        self
    }

    /// The audio development framework, pinned to the release the pipeline sources target.
    pub fn esp_adf() -> Self {
        Self::new("esp-adf", "https://github.com/espressif/esp-adf", "v2.5")
            .path("components")
            .components(["*"])
            .submodules(["components/esp-sr", "components/esp-adf-libs"])
    }

    pub fn esp_dsp() -> Self {
        Self::new("esp-dsp", "https://github.com/espressif/esp-dsp", "v1.2.0")
    }
}
