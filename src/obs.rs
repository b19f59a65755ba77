//! Observability helpers shared by the authority and the API client.
//!
//! Every instrumented operation runs inside a `housekeeping_bridge.flow` span carrying the `flow`
//! and `stage` fields. With the `metrics` feature enabled, each attempt, success, and failure also
//! increments the `housekeeping_bridge_flow_total` counter labeled by `flow` and `outcome`, and
//! each failure increments `housekeeping_bridge_flow_errors_total` labeled by `flow` and the
//! error kind.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization URL composition.
	Authorize,
	/// Authorization code exchange on callback.
	CodeExchange,
	/// Refresh token grant.
	Refresh,
	/// Room listing.
	ListRooms,
	/// Housekeeping status update.
	UpdateHousekeeping,
	/// Bootstrap login loop.
	Login,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Authorize => "authorize",
			FlowKind::CodeExchange => "code_exchange",
			FlowKind::Refresh => "refresh",
			FlowKind::ListRooms => "list_rooms",
			FlowKind::UpdateHousekeeping => "update_housekeeping",
			FlowKind::Login => "login",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}

	/// Picks the terminal outcome for `result`.
	pub fn of<T, E>(result: &std::result::Result<T, E>) -> Self {
		if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure }
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a flow span, recording the attempt and its terminal outcome.
pub(crate) async fn observe<T, Fut>(kind: FlowKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = FlowSpan::new(kind, stage).instrument(fut).await;

	record_flow_outcome(kind, FlowOutcome::of(&result));

	if let Err(e) = &result {
		record_flow_error(kind, e.kind());
	}

	result
}
