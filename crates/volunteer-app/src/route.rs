use core::fmt;
use volunteer_common::Role;

/// Every page of the console.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Welcome,
    Login,
    Register,
    ConfirmEmail { token: String },
    Profile,
    Admin,
    Events,
    NewEvent,
    EditEvent { id: u32 },
    UserEvents,
    VolunteerMatching,
    VolunteerHistory,
    UserManagement,
    Notifications,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Self::Welcome => "/".into(),
            Self::Login => "/login".into(),
            Self::Register => "/register".into(),
            Self::ConfirmEmail { token } => format!("/confirm/{token}"),
            Self::Profile => "/profile".into(),
            Self::Admin => "/admin".into(),
            Self::Events => "/events".into(),
            Self::NewEvent => "/events/new".into(),
            Self::EditEvent { id } => format!("/events/{id}/edit"),
            Self::UserEvents => "/userEvent".into(),
            Self::VolunteerMatching => "/matching".into(),
            Self::VolunteerHistory => "/history".into(),
            Self::UserManagement => "/users".into(),
            Self::Notifications => "/notifications".into(),
        }
    }

    /// Resolve a path. Anything unrecognised lands on the welcome page.
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Self::Welcome,
            ["login"] => Self::Login,
            ["register"] => Self::Register,
            ["confirm", token] => Self::ConfirmEmail {
                token: (*token).to_owned(),
            },
            ["profile"] => Self::Profile,
            ["admin"] => Self::Admin,
            ["events"] => Self::Events,
            ["events", "new"] => Self::NewEvent,
            ["events", id, "edit"] => match id.parse() {
                Ok(id) => Self::EditEvent { id },
                Err(_) => Self::Welcome,
            },
            ["userEvent"] => Self::UserEvents,
            ["matching"] => Self::VolunteerMatching,
            ["history"] => Self::VolunteerHistory,
            ["users"] => Self::UserManagement,
            ["notifications"] => Self::Notifications,
            _ => Self::Welcome,
        }
    }

    /// Pages that need a session. The public ones are the entry points a
    /// logged-out visitor can reach.
    pub fn is_protected(&self) -> bool {
        !matches!(
            self,
            Self::Welcome | Self::Login | Self::Register | Self::ConfirmEmail { .. }
        )
    }

    /// Where to go right after signing in: onboarding first, then the
    /// role's home page.
    pub fn landing_for(role: Option<&Role>, profile_completed: bool) -> Self {
        if !profile_completed {
            Self::Profile
        } else if role.is_some_and(Role::is_admin) {
            Self::Admin
        } else {
            Self::UserEvents
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
