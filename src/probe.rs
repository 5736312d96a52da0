use std::time::Duration;
use tracing::debug;

/// Lightweight "is this URL fetchable" check used to validate evidence URLs
/// before handing them to a client. HEAD only, never the body.
pub trait UrlProbe: Send + Sync {
    fn is_reachable(&self, url: &str) -> bool;
}

pub struct HttpProbe {
    agent: ureq::Agent,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .new_agent();

        Self { agent }
    }
}

impl UrlProbe for HttpProbe {
    fn is_reachable(&self, url: &str) -> bool {
        // Non-2xx statuses surface as Err, so any Ok means reachable.
        // A timeout is indistinguishable from any other failure here.
        match self.agent.head(url).call() {
            Ok(_) => true,
            Err(err) => {
                debug!(error = %err, url, "URL probe failed");
                false
            }
        }
    }
}
