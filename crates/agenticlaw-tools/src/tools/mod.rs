//! Built-in tool implementations.
//!
//! Each tool is a self-contained module. To add a new tool:
//! 1. Create a new file in this directory
//! 2. Implement the Tool trait
//! 3. Add `pub mod <name>;` here
//! 4. Wire it up wherever the registry for that agent is assembled

pub mod delegate;
pub mod kg;
pub mod memory;
pub mod toolbox;
