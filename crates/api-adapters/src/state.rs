//! Shared handler state. Cheap to clone: every field is an `Arc`.

use std::sync::Arc;
use std::time::Duration;

use domains::{AuthProvider, Clock};
use services::{
    ListingService, Ports, ProfileService, ReferenceDataService, ReportService, RetryPolicy,
    SubmissionService, VoteService,
};

use crate::metrics::Metrics;

/// Tunables the binary reads from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub retry: RetryPolicy,
    pub page_size: u32,
    pub reference_ttl: Duration,
}

#[derive(Clone)]
pub struct AppState {
    pub listing: Arc<ListingService>,
    pub votes: Arc<VoteService>,
    pub submission: Arc<SubmissionService>,
    pub reports: Arc<ReportService>,
    pub profiles: Arc<ProfileService>,
    pub reference: Arc<ReferenceDataService>,
    pub auth: Arc<dyn AuthProvider>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Builds every service on top of one set of ports.
    pub fn new(
        ports: Ports,
        auth: Arc<dyn AuthProvider>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        let retry = settings.retry;
        let reference = Arc::new(ReferenceDataService::new(
            ports.tags.clone(),
            ports.tech_stacks.clone(),
            retry,
            settings.reference_ttl,
            clock.clone(),
        ));
        let listing = Arc::new(ListingService::new(ports.clone(), retry, settings.page_size));

        Self {
            votes: Arc::new(VoteService::new(ports.ideas.clone(), ports.votes.clone(), retry)),
            submission: Arc::new(SubmissionService::new(
                ports.clone(),
                reference.clone(),
                clock.clone(),
                retry,
            )),
            reports: Arc::new(ReportService::new(ports.clone(), clock.clone(), retry)),
            profiles: Arc::new(ProfileService::new(ports, listing.clone(), clock, retry)),
            listing,
            reference,
            auth,
            metrics: Arc::new(Metrics::new()),
        }
    }
}
