use smsbridge_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no bridge registered for letter '{letter}'")]
    UnknownBridge { letter: char },

    #[error("no bridge found for shortcode '{shortcode}'; available: {available}")]
    UnknownShortcode { shortcode: String, available: String },

    #[error("payload failed its integrity check")]
    AuthenticationFailure,

    #[error("content record is missing the {field} field")]
    MissingField { field: &'static str },

    #[error("locale '{locale}' is not available; available: {available}")]
    UnknownLocale { locale: String, available: String },

    #[error("translation key '{key}' is missing under the '{locale}' locale")]
    MissingTranslation { key: String, locale: String },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bridge manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("locale file error: {0}")]
    LocaleFile(#[from] toml::de::Error),
}
