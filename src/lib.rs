//! Client-side play gating for Cheddar Maze: backend eligibility queries,
//! the eligibility cell, the action gate, overlay state, and the screen view
//! model that ties them together.

pub mod container;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod gate;
pub mod maze_client;
pub mod near;
pub mod overlays;
pub mod session;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use container::{
    BoardVisibility,
    ContainerConfig,
    ContainerView,
    GameboardContainer,
    Outcome,
};
pub use eligibility::{
    ApplyOutcome,
    Eligibility,
    EligibilityResult,
    EligibilityState,
    QueryTicket,
};
pub use gate::{
    Action,
    ActionKind,
    HandlerRegistry,
    InteractionGate,
    Verdict,
};
pub use maze_client::{
    MazeClient,
    MazeClientConfig,
    SeedId,
};
pub use overlays::{
    Overlay,
    OverlayVisibility,
};
