use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] agenticlaw_llm::LlmError),

    #[error(transparent)]
    Memory(#[from] agenticlaw_memory::MemoryStreamError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
