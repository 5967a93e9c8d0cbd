//! View-state controller for the vLLM Ascend playground
//!
//! This crate provides the core functionality for:
//! - Typed access to the playground REST backend
//! - Sequence-stamped collection caches with wholesale replacement
//! - Filtering, NPU selection and serving command preview
//! - Mutate-then-refetch operator actions with notifications
//! - Cancellable status polling and observability

pub mod api;
pub mod benchmark;
pub mod cache;
pub mod controller;
pub mod error;
pub mod filter;
pub mod models;
pub mod notify;
pub mod observability;
pub mod poller;
pub mod selection;
pub mod serving;
pub mod settings;
pub mod view;

#[cfg(test)]
mod test_support;

pub use api::{HttpApi, HttpApiBuilder, LogSource, PlaygroundApi};
pub use cache::{CollectionKind, CollectionState};
pub use controller::{
    AlwaysConfirm, ChatOutcome, ChatSettings, Confirmer, Controller, Mutation, Outcome,
    RefreshOutcome, ViewEvent,
};
pub use error::{ApiError, ApiResult};
pub use models::*;
pub use observability::{ControllerMetrics, StructuredLogger};
pub use poller::{PollerBuilder, PollerHandle, StatusPoller};
pub use settings::ControllerConfig;
