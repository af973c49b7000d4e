pub mod opcode;
pub mod cursor;
pub mod layout;
pub mod walk;
pub mod program;
pub mod metrics;
pub mod stress;

pub use cursor::{FixedWidth, InstructionCursor};
pub use opcode::Opcode;
