//! listscale-grpc — the external scaler protocol over gRPC.
//!
//! Serves the `externalscaler.ExternalScaler` service the autoscaling
//! controller polls:
//!
//! ```text
//! New(scaledObjectRef, metadata) → register the workload
//! Close(scaledObjectRef)         → forget it
//! IsActive(scaledObjectRef)      → queue length > 0
//! GetMetricSpec(scaledObjectRef) → [("RedisListLength", listLength)]
//! GetMetrics(scaledObjectRef)    → [("RedisListLength", queue length)]
//! ```
//!
//! Caller deadlines (`grpc-timeout`) bound the store query. TLS material
//! is loaded from a certificate directory by [`tls::server_tls_config`].

pub mod deadline;
pub mod server;
pub mod tls;

/// Generated protobuf types and gRPC service stubs.
pub mod proto {
    tonic::include_proto!("externalscaler");
}

pub use server::{ScalerGrpcServer, to_status};

/// Port the scaler listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8080;
