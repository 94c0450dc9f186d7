//! Ordered interceptor chain wrapped around an HTTP transport.
//!
//! Every outbound API request passes through each [`Interceptor`] in
//! registration order before reaching the [`Transport`]. A stage may mutate
//! the request, short-circuit with an error, or hand off to the rest of the
//! chain through [`Next::run`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::{Request, Response};

use crate::error::{Error, Result};

/// Boxed future returned by pipeline stages and transports.
pub type PipelineFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;

/// Sends a fully-built request.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: Request) -> PipelineFuture<'_>;
}

impl Transport for reqwest::Client {
    fn send(&self, request: Request) -> PipelineFuture<'_> {
        Box::pin(async move { self.execute(request).await.map_err(Error::from) })
    }
}

/// One stage of the request pipeline.
pub trait Interceptor: Send + Sync + 'static {
    /// Short name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Handle `request`, usually by calling `next.run(request)`.
    fn intercept<'a>(&'a self, request: Request, next: Next<'a>) -> PipelineFuture<'a>;
}

/// The remainder of the chain after the current stage.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    /// Pass `request` to the next stage, or to the transport if none remain.
    pub fn run(self, request: Request) -> PipelineFuture<'a> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                log::trace!("{} {} -> {}", request.method(), request.url(), stage.name());
                stage.intercept(
                    request,
                    Next {
                        stages: rest,
                        transport: self.transport,
                    },
                )
            }
            None => self.transport.send(request),
        }
    }
}

/// Interceptors plus the transport they lead to.
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            stages: Vec::new(),
            transport,
        }
    }

    /// Append a stage; it runs after every stage already registered.
    pub fn with_stage(mut self, stage: Arc<dyn Interceptor>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append several stages in order.
    pub fn with_stages(mut self, stages: impl IntoIterator<Item = Arc<dyn Interceptor>>) -> Self {
        self.stages.extend(stages);
        self
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run `request` through every stage and the transport.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        Next {
            stages: &self.stages,
            transport: self.transport.as_ref(),
        }
        .run(request)
        .await
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use reqwest::header::HeaderMap;

    use super::*;

    /// Transport that records each request's headers and answers `200 []`.
    #[derive(Default)]
    pub struct RecordingTransport {
        pub seen: Mutex<Vec<(String, HeaderMap)>>,
    }

    impl RecordingTransport {
        pub fn last_headers(&self) -> HeaderMap {
            self.seen
                .lock()
                .unwrap()
                .last()
                .map(|(_, h)| h.clone())
                .unwrap_or_default()
        }

        pub fn count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl Transport for RecordingTransport {
        fn send(&self, request: Request) -> PipelineFuture<'_> {
            self.seen
                .lock()
                .unwrap()
                .push((request.url().to_string(), request.headers().clone()));
            Box::pin(async {
                let response = http::Response::builder()
                    .status(200)
                    .body("[]")
                    .unwrap();
                Ok(Response::from(response))
            })
        }
    }

    pub fn get(url: &str) -> Request {
        Request::new(reqwest::Method::GET, reqwest::Url::parse(url).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use reqwest::header::HeaderValue;

    use super::testing::{RecordingTransport, get};
    use super::*;

    /// Stamps its name into `x-order` so tests can see execution order.
    struct Mark(&'static str, Arc<Mutex<Vec<&'static str>>>);

    impl Interceptor for Mark {
        fn name(&self) -> &'static str {
            self.0
        }

        fn intercept<'a>(&'a self, mut request: Request, next: Next<'a>) -> PipelineFuture<'a> {
            self.1.lock().unwrap().push(self.0);
            request
                .headers_mut()
                .append("x-order", HeaderValue::from_static(self.0));
            next.run(request)
        }
    }

    struct Reject;

    impl Interceptor for Reject {
        fn name(&self) -> &'static str {
            "reject"
        }

        fn intercept<'a>(&'a self, _request: Request, _next: Next<'a>) -> PipelineFuture<'a> {
            Box::pin(async { Err(Error::Navigation("rejected".into())) })
        }
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = Pipeline::new(transport.clone())
            .with_stage(Arc::new(Mark("first", order.clone())))
            .with_stage(Arc::new(Mark("second", order.clone())));

        let response = pipeline.execute(get("http://api/v1/users")).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(pipeline.stage_names(), vec!["first", "second"]);

        let headers = transport.last_headers();
        let stamped: Vec<_> = headers.get_all("x-order").iter().collect();
        assert_eq!(stamped, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_empty_pipeline_goes_straight_to_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = Pipeline::new(transport.clone());
        pipeline.execute(get("http://api/v1/audit")).await.unwrap();
        assert_eq!(transport.count(), 1);
        assert!(pipeline.stage_names().is_empty());
    }

    #[tokio::test]
    async fn test_stage_can_short_circuit() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = Pipeline::new(transport.clone())
            .with_stage(Arc::new(Reject))
            .with_stage(Arc::new(Mark("never", order.clone())));

        let result = pipeline.execute(get("http://api/v1/users")).await;
        assert!(matches!(result, Err(Error::Navigation(_))));
        assert!(order.lock().unwrap().is_empty());
        assert_eq!(transport.count(), 0);
    }
}
