use std::time::Instant;

use rocket::{
    Data, Request, Response,
    fairing::{Fairing, Info, Kind},
    http::Header,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Installs the global `fmt` subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[derive(Debug, Clone, Copy)]
struct RequestStart {
    id: Uuid,
    at: Instant,
}

impl RequestStart {
    fn now() -> Self {
        Self {
            id: Uuid::new_v4(),
            at: Instant::now(),
        }
    }
}

/// Tags every request with an id and logs it on the way in and out.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _: &mut Data<'_>) {
        let start = req.local_cache(RequestStart::now);
        info!("{} :: Got request >> {} {}", start.id, req.method(), req.uri());
        debug!("{} :: Started processing", start.id);
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let start = req.local_cache(RequestStart::now);
        let elapsed_ms = start.at.elapsed().as_millis();
        debug!("{} :: Finished processing", start.id);
        info!(
            "{} :: Sent response >> {} ({} ms)",
            start.id,
            res.status(),
            elapsed_ms
        );
        res.set_header(Header::new("X-Request-Id", start.id.to_string()));
    }
}
