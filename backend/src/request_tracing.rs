use std::sync::Arc;
use std::time::Instant;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};

use crate::telemetry::{RequestRecord, Telemetry};

struct RequestStart(Instant);

/// Reports every handled request (method, path, status, latency) to
/// telemetry.
pub struct RequestTracing {
    telemetry: Arc<dyn Telemetry>,
}

impl RequestTracing {
    pub fn new(telemetry: Arc<dyn Telemetry>) -> Self {
        Self { telemetry }
    }
}

#[rocket::async_trait]
impl Fairing for RequestTracing {
    fn info(&self) -> Info {
        Info {
            name: "Request tracing",
            kind: Kind::Request | Kind::Response
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        req.local_cache(|| RequestStart(Instant::now()));
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let start = req.local_cache(|| RequestStart(Instant::now()));

        self.telemetry.track_request(&RequestRecord {
            method: req.method().as_str().to_string(),
            path: req.uri().path().to_string(),
            status: res.status().code,
            duration: start.0.elapsed(),
        });
    }
}
