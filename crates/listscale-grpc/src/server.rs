//! External scaler gRPC server.
//!
//! Implements the `ExternalScaler` service by translating messages to
//! and from [`ListScaler`] calls. All scaler state lives in the
//! `ListScaler`; this layer only maps shapes and errors.

use std::sync::Arc;

use listscale_core::{ListScaler, ScalerError, WorkloadId};
use listscale_store::QueueLengthSource;
use tonic::{Request, Response, Status};

use crate::deadline::grpc_timeout;
use crate::proto;
use crate::proto::external_scaler_server::{ExternalScaler, ExternalScalerServer};

/// gRPC implementation of the external scaler service.
pub struct ScalerGrpcServer<S> {
    scaler: Arc<ListScaler<S>>,
}

impl<S: QueueLengthSource> ScalerGrpcServer<S> {
    /// Create a server backed by the given scaler.
    pub fn new(scaler: Arc<ListScaler<S>>) -> Self {
        Self { scaler }
    }

    /// Get the tonic service for mounting on a gRPC server.
    pub fn into_service(self) -> ExternalScalerServer<Self> {
        ExternalScalerServer::new(self)
    }
}

/// Map a scaler failure onto a gRPC status, keeping its message.
pub fn to_status(err: ScalerError) -> Status {
    let message = err.to_string();
    match err {
        ScalerError::Configuration(_) => Status::invalid_argument(message),
        ScalerError::NotRegistered(_) => Status::not_found(message),
        ScalerError::StoreQuery(e) if e.is_timeout() => Status::deadline_exceeded(message),
        ScalerError::StoreQuery(_) => Status::unavailable(message),
    }
}

fn workload(reference: &proto::ScaledObjectRef) -> WorkloadId {
    WorkloadId::new(&reference.namespace, &reference.name)
}

fn required_workload(reference: Option<&proto::ScaledObjectRef>) -> Result<WorkloadId, Status> {
    reference
        .map(workload)
        .ok_or_else(|| Status::invalid_argument("missing scaledObjectRef"))
}

#[tonic::async_trait]
impl<S: QueueLengthSource> ExternalScaler for ScalerGrpcServer<S> {
    async fn new(
        &self,
        request: Request<proto::NewRequest>,
    ) -> Result<Response<proto::Empty>, Status> {
        let req = request.into_inner();
        let id = required_workload(req.scaled_object_ref.as_ref())?;

        self.scaler
            .register(id, &req.metadata)
            .await
            .map_err(to_status)?;

        Ok(Response::new(proto::Empty {}))
    }

    async fn close(
        &self,
        request: Request<proto::ScaledObjectRef>,
    ) -> Result<Response<proto::Empty>, Status> {
        let id = workload(request.get_ref());
        self.scaler.deregister(&id).await;
        Ok(Response::new(proto::Empty {}))
    }

    async fn is_active(
        &self,
        request: Request<proto::ScaledObjectRef>,
    ) -> Result<Response<proto::IsActiveResponse>, Status> {
        let deadline = grpc_timeout(&request);
        let id = workload(request.get_ref());

        let result = self
            .scaler
            .is_active(&id, deadline)
            .await
            .map_err(to_status)?;

        Ok(Response::new(proto::IsActiveResponse { result }))
    }

    async fn get_metric_spec(
        &self,
        request: Request<proto::ScaledObjectRef>,
    ) -> Result<Response<proto::GetMetricSpecResponse>, Status> {
        let id = workload(request.get_ref());

        let spec = self.scaler.metric_spec(&id).map_err(to_status)?;

        Ok(Response::new(proto::GetMetricSpecResponse {
            metric_specs: vec![proto::MetricSpec {
                metric_name: spec.metric_name,
                target_size: spec.target_size,
            }],
        }))
    }

    async fn get_metrics(
        &self,
        request: Request<proto::GetMetricsRequest>,
    ) -> Result<Response<proto::GetMetricsResponse>, Status> {
        let deadline = grpc_timeout(&request);
        let req = request.into_inner();
        let id = required_workload(req.scaled_object_ref.as_ref())?;

        let value = self
            .scaler
            .metric_value(&id, &req.metric_name, deadline)
            .await
            .map_err(to_status)?;

        Ok(Response::new(proto::GetMetricsResponse {
            metric_values: vec![proto::MetricValue {
                metric_name: value.metric_name,
                metric_value: value.metric_value,
            }],
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use listscale_store::StoreError;
    use tonic::Code;

    use super::*;

    #[test]
    fn configuration_error_is_invalid_argument() {
        let status = to_status(ScalerError::Configuration("no list name given".into()));
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "configuration error: no list name given");
    }

    #[test]
    fn not_registered_is_not_found() {
        let status = to_status(ScalerError::NotRegistered("default/worker".into()));
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "Cannot find scaler default/worker");
    }

    #[test]
    fn store_timeout_is_deadline_exceeded() {
        let status = to_status(ScalerError::StoreQuery(StoreError::Timeout(
            Duration::from_secs(1),
        )));
        assert_eq!(status.code(), Code::DeadlineExceeded);
    }

    #[test]
    fn store_failure_is_unavailable_with_verbatim_message() {
        let err = StoreError::InvalidAddress("redis:x".into());
        let expected = err.to_string();
        let status = to_status(ScalerError::StoreQuery(err));
        assert_eq!(status.code(), Code::Unavailable);
        assert_eq!(status.message(), expected);
    }

    #[test]
    fn workload_from_reference() {
        let reference = proto::ScaledObjectRef {
            name: "worker".into(),
            namespace: "default".into(),
        };
        assert_eq!(workload(&reference).as_str(), "default/worker");
    }

    #[test]
    fn missing_reference_is_invalid_argument() {
        let status = required_workload(None).unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }
}
