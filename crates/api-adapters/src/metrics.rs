//! Prometheus registry exposed at `GET /metrics`.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub route: String,
    pub status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct VoteLabels {
    pub action: String,
}

pub struct Metrics {
    registry: Registry,
    http_requests: Family<RequestLabels, Counter>,
    votes: Family<VoteLabels, Counter>,
    listing_failures: Counter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("ideashare");
        let http_requests = Family::<RequestLabels, Counter>::default();
        let votes = Family::<VoteLabels, Counter>::default();
        let listing_failures = Counter::default();

        registry.register("http_requests", "HTTP requests by matched route and status", http_requests.clone());
        registry.register("votes", "Vote toggles by resulting action", votes.clone());
        registry.register(
            "listing_failures",
            "Listing requests answered with an empty page because the query failed",
            listing_failures.clone(),
        );

        Self {
            registry,
            http_requests,
            votes,
            listing_failures,
        }
    }

    pub fn record_request(&self, route: &str, status: u16) {
        self.http_requests
            .get_or_create(&RequestLabels {
                route: route.to_string(),
                status: status.to_string(),
            })
            .inc();
    }

    pub fn record_vote(&self, action: &str) {
        self.votes
            .get_or_create(&VoteLabels { action: action.to_string() })
            .inc();
    }

    pub fn record_listing_failure(&self) {
        self.listing_failures.inc();
    }

    /// OpenMetrics text exposition.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        encode(&mut out, &self.registry)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_show_up_in_exposition() {
        let metrics = Metrics::new();
        metrics.record_request("/api/ideas", 200);
        metrics.record_vote("added");
        metrics.record_vote("added");
        metrics.record_listing_failure();

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"ideashare_http_requests_total{route="/api/ideas",status="200"} 1"#));
        assert!(text.contains(r#"ideashare_votes_total{action="added"} 2"#));
        assert!(text.contains("ideashare_listing_failures_total 1"));
    }
}
