use crate::{capability::InpaintError, plan::SquareKey};

pub type OutwardResult<T> = Result<T, OutwardError>;

#[derive(thiserror::Error, Debug)]
pub enum OutwardError {
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("invalid step: {0}")]
    InvalidStep(String),

    #[error("detection unavailable: {0}")]
    Detection(String),

    #[error("inpainting failed at square '{key}' (plan index {index}): {source}")]
    Inpaint {
        key: SquareKey,
        index: usize,
        #[source]
        source: InpaintError,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OutwardError {
    pub fn invalid_dimensions(msg: impl Into<String>) -> Self {
        Self::InvalidDimensions(msg.into())
    }

    pub fn invalid_step(msg: impl Into<String>) -> Self {
        Self::InvalidStep(msg.into())
    }

    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    pub fn inpaint(key: SquareKey, index: usize, source: InpaintError) -> Self {
        Self::Inpaint { key, index, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capability::InpaintError, plan::Leg};

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            OutwardError::invalid_dimensions("x")
                .to_string()
                .contains("invalid dimensions:")
        );
        assert!(
            OutwardError::invalid_step("x")
                .to_string()
                .contains("invalid step:")
        );
        assert!(
            OutwardError::detection("x")
                .to_string()
                .contains("detection unavailable:")
        );
        assert!(
            OutwardError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            OutwardError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn inpaint_reports_square_key_and_index() {
        let err = OutwardError::inpaint(
            SquareKey::new(Leg::UpLeft, 3),
            7,
            InpaintError::network("timed out"),
        );
        let msg = err.to_string();
        assert!(msg.contains("up_left-3"));
        assert!(msg.contains("plan index 7"));
        assert!(msg.contains("timed out"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = OutwardError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
