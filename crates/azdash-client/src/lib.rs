//! azdash client: the request pipeline, auth wiring, routing and the data
//! endpoints behind the dashboard.
//!
//! Provides:
//! - [`bootstrap`] — Fetch the auth policy and assemble an [`App`]
//! - [`provide_auth`] — Pick providers for a policy (one branch on `enabled`)
//! - [`Pipeline`] — Ordered interceptors in front of the HTTP transport
//! - [`ApimHeader`] / [`BearerToken`] — The two request stages
//! - [`Router`] — Route table with the session guard
//! - [`ApiClient`] / [`Dashboard`] — Users, audit log and health

mod api;
mod bootstrap;
mod dashboard;
mod error;
mod interceptors;
mod pipeline;
mod router;
mod wiring;

pub use api::{ApiClient, AuditEvent, Health, User, health_root};
pub use bootstrap::{App, Screen, Settings, bootstrap};
pub use dashboard::{Dashboard, Section, SectionFailure};
pub use error::{Error, Result};
pub use interceptors::{
    APIM_HEADER, ApimHeader, BearerToken, FixedOverride, OverrideStore, ProtectedResourceMap,
};
pub use pipeline::{Interceptor, Next, Pipeline, PipelineFuture, Transport};
pub use router::{Navigation, Route, RouteTarget, Router, View, WILDCARD, routes};
pub use wiring::{AuthProviders, IdentityFactory, build_pipeline, provide_auth};
