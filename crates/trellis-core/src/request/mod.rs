//! Request model.
//!
//! A request is created by the boundary layer for each inbound call and shared
//! between routing hops as an `Arc`. When a router strips a matched prefix it
//! forwards a rewritten copy, so an upstream hop never observes a downstream
//! change to its request.

pub mod types;

pub use types::{
    ActionRequest, CreateRequest, DeleteRequest, PatchOperation, PatchOperationKind,
    PatchRequest, QueryRequest, ReadRequest, Request, RequestType, SortKey, UpdateRequest,
};
