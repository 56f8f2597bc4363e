use serde::Deserialize;

/// Tool configuration, loaded from a TOML file.
#[derive(Debug, Deserialize)]
pub struct CliConfig {
    /// Active version markers, in activation order.
    #[serde(default = "default_markers")]
    pub markers: Vec<u8>,

    /// Locale used for reply prompts.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Path to a locale TOML file; builtin translations when unset.
    pub locale_path: Option<String>,

    /// Path to the bridge manifest (JSON).
    pub manifest_path: Option<String>,
}

fn default_markers() -> Vec<u8> {
    vec![0x0A, 0x03, 0x04]
}

fn default_locale() -> String {
    "en".into()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            markers: default_markers(),
            locale: default_locale(),
            locale_path: None,
            manifest_path: None,
        }
    }
}
