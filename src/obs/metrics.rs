// self
use crate::{
	error::ErrorKind,
	obs::{FlowKind, FlowOutcome},
};

/// Counter incremented once per flow attempt and once per terminal outcome.
pub const FLOW_COUNTER: &str = "housekeeping_bridge_flow_total";
/// Counter incremented per failed flow, labeled by error kind.
pub const FLOW_ERROR_COUNTER: &str = "housekeeping_bridge_flow_errors_total";

/// Records a flow outcome through the global metrics recorder; a no-op without `metrics`.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(FLOW_COUNTER, "flow" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Records the classification of a failed flow.
pub fn record_flow_error(kind: FlowKind, error: ErrorKind) {
	#[cfg(feature = "metrics")]
	metrics::counter!(FLOW_ERROR_COUNTER, "flow" => kind.as_str(), "kind" => error.as_str())
		.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, error);
}
