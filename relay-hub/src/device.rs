use crate::errors::{Error, Result};
use crate::metrics::{DEVICE_FAILURES_TOTAL, DEVICE_REQUESTS_IN_FLIGHT};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outbound link to the relay board.
///
/// `dispatch_toggle` only has to hand the request off; the response is never
/// awaited by the caller. An `Err` means the request could not be started at all.
pub trait RelayClient: Send + Sync {
    fn dispatch_toggle(&self, address: &str, relay: u32) -> Result<()>;

    /// Requests started but not yet answered.
    fn in_flight(&self) -> usize;

    /// Whether the most recently completed request got a response.
    fn is_online(&self) -> bool;
}

pub const DEFAULT_DEVICE_PORT: u16 = 80;

pub fn toggle_url(address: &str, port: u16, relay: u32) -> String {
    if port == DEFAULT_DEVICE_PORT {
        format!("http://{}/toggle?r={}", address, relay)
    } else {
        format!("http://{}:{}/toggle?r={}", address, port, relay)
    }
}

#[derive(Debug)]
struct LinkStatus {
    in_flight: AtomicUsize,
    online: AtomicBool,
}

/// Fire-and-forget HTTP client for the relay board's `/toggle` endpoint.
#[derive(Debug, Clone)]
pub struct HttpRelayClient {
    client: reqwest::Client,
    port: u16,
    link: Arc<LinkStatus>,
}

impl HttpRelayClient {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            port: DEFAULT_DEVICE_PORT,
            link: Arc::new(LinkStatus {
                in_flight: AtomicUsize::new(0),
                online: AtomicBool::new(true),
            }),
        }
    }

    /// Port the board's HTTP server listens on; the address itself stays a bare dotted quad.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl Default for HttpRelayClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayClient for HttpRelayClient {
    fn dispatch_toggle(&self, address: &str, relay: u32) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

        let url = toggle_url(address, self.port, relay);
        let request = self.client.get(&url).build()?;

        self.link.in_flight.fetch_add(1, Ordering::SeqCst);
        DEVICE_REQUESTS_IN_FLIGHT.inc();

        let client = self.client.clone();
        let link = Arc::clone(&self.link);
        runtime.spawn(async move {
            match client.execute(request).await {
                Ok(response) => {
                    debug!("Relay board answered {} for {}", response.status(), url);
                    link.online.store(true, Ordering::SeqCst);
                }
                Err(e) => {
                    warn!("Relay board request {} failed: {}", url, e);
                    DEVICE_FAILURES_TOTAL.inc();
                    link.online.store(false, Ordering::SeqCst);
                }
            }
            link.in_flight.fetch_sub(1, Ordering::SeqCst);
            DEVICE_REQUESTS_IN_FLIGHT.dec();
        });

        Ok(())
    }

    fn in_flight(&self) -> usize {
        self.link.in_flight.load(Ordering::SeqCst)
    }

    fn is_online(&self) -> bool {
        self.link.online.load(Ordering::SeqCst)
    }
}
