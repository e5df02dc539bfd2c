pub mod bridge;
pub mod error;
pub mod format;
pub mod interpreter;
pub mod opcode;
pub mod parser;
pub mod pool;
pub mod result;
pub mod runtime;
pub mod speaker;
pub mod stats;
pub mod storage;
pub mod text;
pub mod value;
