//! Agenticlaw Gateway — the RPC surface for the engine's external
//! interfaces (spec §6): project lifecycle, graph CRUD, message delivery,
//! and introspection. Wire framing is left to the embedder.

pub mod context;
pub mod rpc;

pub use context::RpcContext;
pub use rpc::{route_rpc, to_response, RpcError, RpcResult};
