use glam::UVec2;

use crate::Capability;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration requires {capability:?}, which the host lacks")]
    MissingCapability { capability: Capability },

    #[error("Environment map is invalid: {reason}")]
    InvalidEnvironmentMap { reason: String },

    #[error("Frame size {size} is invalid")]
    InvalidFrameSize { size: UVec2 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
