//! C8 order state machine (§4.8). Terminal states never transition further;
//! [`OrderState::is_terminal`] is the invariant every transition method in
//! [`crate::OrderLifecycleManager`] checks before mutating a slot.

/// One order's position in the lifecycle graph.
///
/// ```text
/// Created --> Validated --> Routed --> PendingNew --> Acknowledged
///                                                        |
///                       +--------------------------------+
///                       v                                v
///               PartiallyFilled ------------------> Filled
///                       |
///                       +--> PendingCancel --> Cancelled
/// Any active --> Rejected | Expired | Suspended | PendingReplace --> Replaced | Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OrderState {
    Created = 0,
    Validated = 1,
    Routed = 2,
    PendingNew = 3,
    Acknowledged = 4,
    PartiallyFilled = 5,
    Filled = 6,
    PendingCancel = 7,
    Cancelled = 8,
    Rejected = 9,
    Expired = 10,
    Suspended = 11,
    PendingReplace = 12,
    Replaced = 13,
    Error = 14,
}

impl OrderState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Expired | Self::Error | Self::Replaced
        )
    }

    /// Active (non-terminal) states an emergency stop or suspend can act on.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

/// Time-in-force instruction carried by an order (§3.2 `OrderRecord`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum TimeInForce {
    #[default]
    Day = 0,
    Ioc = 1,
    Gtc = 2,
}
