use serde::{Deserialize, Serialize};

/// The outcome of the (external) OAuth device-flow login: who the caller is
/// and which roles they were granted. The engine never performs the login
/// itself, it only consumes this claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaim {
    pub user_id: String,
    pub display_name: String,
    pub is_participant: bool,
    pub is_coordinator: bool,
}

impl AuthClaim {
    pub fn participant(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            is_participant: true,
            is_coordinator: false,
        }
    }

    pub fn coordinator(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            is_participant: true,
            is_coordinator: true,
        }
    }

    pub fn can_contribute(&self) -> bool {
        self.is_participant || self.is_coordinator
    }
}
