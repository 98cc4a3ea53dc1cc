use core::fmt;
use serde::{Deserialize, Serialize};

/// A volunteer's full user record, as served by the profile endpoint.
///
/// Every field defaults when the server leaves it out. Fields this type
/// doesn't know about are kept in `extra` so a record can be round-tripped
/// back to the server without losing anything.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Profile {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub full_name: String,

    #[serde(default)]
    pub address1: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address2: String,

    #[serde(default)]
    pub city: String,

    /// Two-letter state code
    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub zipcode: String,

    #[serde(default)]
    pub skills: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub preferences: String,

    /// ISO dates the volunteer is available on
    #[serde(default)]
    pub availability: Vec<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Profile {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }

    /// True when the record carries no data at all. The API answers unknown
    /// users with `{}`, which decodes to this.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Role tag attached to an account.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Volunteer,
    Other(String),
}

impl Role {
    /// Parse the free-text stored form. Empty means "no role".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "" => None,
            "admin" => Some(Self::Admin),
            "volunteer" => Some(Self::Volunteer),
            other => Some(Self::Other(other.to_owned())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Volunteer => "volunteer",
            Self::Other(s) => s.as_str(),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Role::parse(&s).ok_or_else(|| serde::de::Error::custom("role must not be empty"))
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of a successful `POST /login`.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct LoginResponse {
    pub role: Role,
    pub email: String,
    #[serde(default)]
    pub profile_completed: bool,
}
