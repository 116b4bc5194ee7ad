use thiserror::Error;
use twinclip_engine::errors::EngineError;
use twinclip_io::IoError;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("读写终端失败: {0}")]
    Terminal(#[from] std::io::Error),
}
