use uuid::Uuid;

/// Caller identity and correlation id for one analysis request.
///
/// Passed explicitly into every pipeline call; nothing about the caller is
/// held in process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: Uuid,
    /// Opaque identifier supplied by the upstream auth layer
    pub user_id: String,
}

impl RequestContext {
    pub const ANONYMOUS: &'static str = "anonymous";

    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: user_id.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(Self::ANONYMOUS)
    }
}
