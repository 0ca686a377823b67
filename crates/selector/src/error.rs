use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("malformed block selector \"{selector}\": {reason}")]
    MalformedSelector { selector: String, reason: String },
}

impl SelectorError {
    pub(crate) fn malformed(selector: &str, reason: impl Into<String>) -> Self {
        SelectorError::MalformedSelector {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}
