//! directrpc Server
//!
//! This crate provides the dispatch core: the handler metadata registry,
//! the per-operation call descriptors and their cache, the parameter
//! resolver turning a loosely typed JSON payload plus the ambient request
//! context into an ordered argument list, and the router invoking the
//! registered operations.
//!
//! # Overview
//!
//! - [`metadata`]: registration table of handler types, methods and markers
//! - [`runtime`]: descriptors, descriptor cache, conversions and resolution
//! - [`api`]: the published remoting API model and its bounded cache
//! - [`router`]: single-call and batch dispatch
//! - [`config`]: router and cache configuration

pub mod api;
pub mod config;
pub mod metadata;
pub mod router;
pub mod runtime;

pub use api::{ApiCacheKey, ApiDescriptorCache, RemotingApi};
pub use config::{ApiCacheConfig, RouterConfig};
pub use metadata::HandlerRegistry;
pub use router::{Operation, Router};
pub use runtime::{CallDescriptor, DescriptorCache, ParameterResolver};
