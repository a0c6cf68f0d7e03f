//! Onboarding: the question sequence a new user answers before chatting,
//! the profile it builds, and the prompts that profile feeds.

pub mod manager;
pub mod model;
pub mod prompts;
pub mod routes;
pub mod state;

pub use manager::OnboardingManager;
pub use model::{PreferenceValue, Preferences, Profile, ProfileField, ProfileUpdate};
pub use routes::{ProfileRouteState, profile_routes};
pub use state::OnboardingStep;
