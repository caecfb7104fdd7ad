pub type FlapResult<T> = Result<T, FlapError>;

#[derive(thiserror::Error, Debug)]
pub enum FlapError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("asset error: {0}")]
    Asset(String),

    #[error("render surface error: {0}")]
    Surface(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlapError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            FlapError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(FlapError::network("x").to_string().contains("network error:"));
        assert!(FlapError::asset("x").to_string().contains("asset error:"));
        assert!(
            FlapError::surface("x")
                .to_string()
                .contains("render surface error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = FlapError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
