//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Social graph
    pub static ref CONNECTION_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("connecthub_connection_requests_total", "Connection requests by outcome"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref CONNECTION_RESPONSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("connecthub_connection_responses_total", "Connection responses by resulting status"),
        &["status"]
    ).expect("metric can be created");

    // Messaging
    pub static ref MESSAGES_SENT_TOTAL: IntCounter = IntCounter::new(
        "connecthub_messages_sent_total",
        "Total number of direct messages sent"
    ).expect("metric can be created");

    // Discovery
    pub static ref DISCOVERY_RESULTS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "connecthub_discovery_results",
            "Number of users returned by a discovery query"
        ).buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0]),
        &["kind"]
    ).expect("metric can be created");

    // Memberships
    pub static ref MEMBERSHIP_CHANGES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("connecthub_membership_changes_total", "Joins and leaves of events and groups"),
        &["kind", "action"]
    ).expect("metric can be created");

    // Application
    pub static ref USERS_TOTAL: IntGauge = IntGauge::new(
        "connecthub_users_total",
        "Total number of registered users"
    ).expect("metric can be created");

    // Errors
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("connecthub_errors_total", "Total number of error responses"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(CONNECTION_REQUESTS_TOTAL.clone()))
        .expect("CONNECTION_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CONNECTION_RESPONSES_TOTAL.clone()))
        .expect("CONNECTION_RESPONSES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(MESSAGES_SENT_TOTAL.clone()))
        .expect("MESSAGES_SENT_TOTAL can be registered");
    REGISTRY
        .register(Box::new(DISCOVERY_RESULTS.clone()))
        .expect("DISCOVERY_RESULTS can be registered");
    REGISTRY
        .register(Box::new(MEMBERSHIP_CHANGES_TOTAL.clone()))
        .expect("MEMBERSHIP_CHANGES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(USERS_TOTAL.clone()))
        .expect("USERS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
