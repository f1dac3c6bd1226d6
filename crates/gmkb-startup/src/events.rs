//! Event names the coordinator consumes and produces.

/// Coordinator identifier carried in emitted payloads.
pub const COORDINATOR_ID: &str = "startup-coordination-manager";

/// `{componentType, operationId}`: a template fetch began.
pub const TEMPLATE_FETCH_START: &str = "template:fetch-start";
/// `{operationId}`: a template fetch finished.
pub const TEMPLATE_FETCH_COMPLETE: &str = "template:fetch-complete";
/// `{operationId}`: a template fetch failed.
pub const TEMPLATE_FETCH_ERROR: &str = "template:fetch-error";
/// `{operation, operationId}`: a state operation began.
pub const STATE_OPERATION_START: &str = "state:operation-start";
/// `{operationId}`: a state operation finished.
pub const STATE_OPERATION_COMPLETE: &str = "state:operation-complete";

/// Hydration began. Blocks rendering.
pub const HYDRATION_START: &str = "state:mkcg-hydration-start";
/// `{error?}`: hydration ended. Unblocks rendering.
pub const HYDRATION_COMPLETE: &str = "state:mkcg-hydration-complete";

/// `{reason, coordinator: true}`
pub const RENDERING_BLOCKED: &str = "rendering:blocked";
/// `{reason, coordinator: true}`
pub const RENDERING_UNBLOCKED: &str = "rendering:unblocked";

/// `{duration, phases, success}`
pub const COORDINATION_COMPLETE: &str = "startup:coordination-complete";
/// `{coordinator, timestamp}`
pub const EMERGENCY_FALLBACK: &str = "startup:emergency-fallback";
