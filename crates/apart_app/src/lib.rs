//! Console front end for apart: wires the worker transport, the pure core
//! state and a line-oriented presentation loop together.
pub mod platform;
