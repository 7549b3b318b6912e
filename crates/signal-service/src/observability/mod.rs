//! Observability for the signaling service.
//!
//! All instrumentation uses `#[instrument(skip_all)]` and explicit field
//! allow-listing. Names and emails are never attached to spans or metric
//! labels.
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `signal_joins_total` | Counter | `outcome` | Join attempts by result |
//! | `signal_relays_total` | Counter | `kind`, `outcome` | Negotiation and chat relays |
//! | `signal_deliveries_dropped_total` | Counter | `reason` | Events not handed to a socket |
//! | `signal_participants_active` | Gauge | none | Registered participants |
//! | `signal_rooms_active` | Gauge | none | Non-empty rooms |
//! | `signal_connections_active` | Gauge | none | Open sockets |
//! | `signal_event_latency_seconds` | Histogram | `event` | Client event handling time |

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};
pub use metrics::init_metrics_recorder;
