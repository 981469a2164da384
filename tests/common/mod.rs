#![allow(dead_code)]

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Write `content` to a temporary `.yaml` file that lives as long as the handle
    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("brrtd_test_")
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }
}

pub mod recording {
    use brrtdispatch::dispatcher::{HandlerRequest, HandlerResponse};
    use brrtdispatch::error::DispatchError;
    use brrtdispatch::handler::Handler;
    use brrtdispatch::middleware::{AsyncInterceptor, Interceptor};
    use brrtdispatch::view::ModelAndView;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Shared, ordered record of every callback that ran
    #[derive(Clone, Default)]
    pub struct CallLog(Arc<Mutex<Vec<String>>>);

    impl CallLog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, entry: String) {
            self.0.lock().push(entry);
        }

        pub fn entries(&self) -> Vec<String> {
            self.0.lock().clone()
        }

        /// Entries for one callback kind, e.g. `"after"`
        pub fn phase(&self, phase: &str) -> Vec<String> {
            let prefix = format!("{phase}:");
            self.entries()
                .into_iter()
                .filter(|e| e.starts_with(&prefix))
                .collect()
        }

        pub fn count(&self, entry: &str) -> usize {
            self.entries().iter().filter(|e| e.as_str() == entry).count()
        }
    }

    /// What a recording interceptor's `pre_handle` answers
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum PreHandle {
        Continue,
        Stop,
        Fail,
    }

    /// Interceptor that logs `pre:`, `post:`, `after:` and `async:` entries under its name
    pub struct RecordingInterceptor {
        name: String,
        log: CallLog,
        pre: PreHandle,
        fail_post_handle: bool,
        fail_after_completion: bool,
        fail_async_started: bool,
        async_capable: bool,
    }

    impl RecordingInterceptor {
        pub fn new(name: &str, log: &CallLog) -> Self {
            Self {
                name: name.to_string(),
                log: log.clone(),
                pre: PreHandle::Continue,
                fail_post_handle: false,
                fail_after_completion: false,
                fail_async_started: false,
                async_capable: false,
            }
        }

        pub fn with_pre(mut self, pre: PreHandle) -> Self {
            self.pre = pre;
            self
        }

        pub fn failing_post_handle(mut self) -> Self {
            self.fail_post_handle = true;
            self
        }

        /// Async-capable, but `after_concurrent_handling_started` fails after logging
        pub fn failing_async_started(mut self) -> Self {
            self.async_capable = true;
            self.fail_async_started = true;
            self
        }

        pub fn failing_after_completion(mut self) -> Self {
            self.fail_after_completion = true;
            self
        }

        pub fn async_capable(mut self) -> Self {
            self.async_capable = true;
            self
        }

        pub fn shared(self) -> Arc<dyn Interceptor> {
            Arc::new(self)
        }
    }

    impl Interceptor for RecordingInterceptor {
        fn name(&self) -> &str {
            &self.name
        }

        fn pre_handle(
            &self,
            _req: &HandlerRequest,
            res: &mut HandlerResponse,
            _handler: &dyn Handler,
        ) -> Result<bool, DispatchError> {
            self.log.push(format!("pre:{}", self.name));
            match self.pre {
                PreHandle::Continue => Ok(true),
                PreHandle::Stop => {
                    res.status = 401;
                    Ok(false)
                }
                PreHandle::Fail => Err(DispatchError::interceptor(&self.name, "pre_handle failed")),
            }
        }

        fn post_handle(
            &self,
            _req: &HandlerRequest,
            _res: &mut HandlerResponse,
            _handler: &dyn Handler,
            _model_and_view: Option<&mut ModelAndView>,
        ) -> Result<(), DispatchError> {
            self.log.push(format!("post:{}", self.name));
            if self.fail_post_handle {
                return Err(DispatchError::interceptor(&self.name, "post_handle failed"));
            }
            Ok(())
        }

        fn after_completion(
            &self,
            _req: &HandlerRequest,
            _res: &mut HandlerResponse,
            _handler: &dyn Handler,
            error: Option<&DispatchError>,
        ) -> Result<(), DispatchError> {
            match error {
                Some(e) => self.log.push(format!("after:{}:{e}", self.name)),
                None => self.log.push(format!("after:{}", self.name)),
            }
            if self.fail_after_completion {
                return Err(DispatchError::interceptor(&self.name, "after_completion failed"));
            }
            Ok(())
        }

        fn as_async(&self) -> Option<&dyn AsyncInterceptor> {
            if self.async_capable {
                Some(self)
            } else {
                None
            }
        }
    }

    impl AsyncInterceptor for RecordingInterceptor {
        fn after_concurrent_handling_started(
            &self,
            _req: &HandlerRequest,
            _res: &mut HandlerResponse,
            _handler: &dyn Handler,
        ) -> Result<(), DispatchError> {
            self.log.push(format!("async:{}", self.name));
            if self.fail_async_started {
                return Err(DispatchError::interceptor(&self.name, "after_concurrent_handling_started failed"));
            }
            Ok(())
        }
    }
}

pub mod requests {
    use brrtdispatch::dispatcher::HandlerRequest;
    use brrtdispatch::middleware::{ACCESS_CONTROL_REQUEST_METHOD, ORIGIN};
    use http::Method;

    pub fn get(path: &str) -> HandlerRequest {
        HandlerRequest::new(Method::GET, path)
    }

    pub fn cors(method: Method, path: &str, origin: &str) -> HandlerRequest {
        HandlerRequest::new(method, path).with_header(ORIGIN, origin)
    }

    pub fn preflight(path: &str, origin: &str, requested_method: &str) -> HandlerRequest {
        HandlerRequest::new(Method::OPTIONS, path)
            .with_header(ORIGIN, origin)
            .with_header(ACCESS_CONTROL_REQUEST_METHOD, requested_method)
    }
}

pub mod test_tracing {
    use tracing::subscriber::DefaultGuard;

    /// Route this thread's events to the test writer so `cargo test -- --nocapture` shows them
    pub struct TestTracing {
        _guard: DefaultGuard,
    }

    impl TestTracing {
        pub fn init() -> Self {
            let subscriber = tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter("brrtdispatch=debug")
                .finish();
            Self {
                _guard: tracing::subscriber::set_default(subscriber),
            }
        }
    }
}
