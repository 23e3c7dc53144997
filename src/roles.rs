use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "member")]
    Student,
    Admin,
    SuperAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CreateClub,
    EditClub,
    DeleteClub,
    ManageClubMembers,
    CreateEvent,
    EditEvent,
    DeleteEvent,
    ManageEventAttendees,
    CreateNews,
    EditNews,
    DeleteNews,
    CreateForumPost,
    ModerateForum,
    ManageUsers,
    ViewAnalytics,
}

const EVERYTHING: &[Permission] = &[
    Permission::CreateClub,
    Permission::EditClub,
    Permission::DeleteClub,
    Permission::ManageClubMembers,
    Permission::CreateEvent,
    Permission::EditEvent,
    Permission::DeleteEvent,
    Permission::ManageEventAttendees,
    Permission::CreateNews,
    Permission::EditNews,
    Permission::DeleteNews,
    Permission::CreateForumPost,
    Permission::ModerateForum,
    Permission::ManageUsers,
    Permission::ViewAnalytics,
];

const STUDENT: &[Permission] = &[
    Permission::CreateClub,
    Permission::CreateEvent,
    Permission::CreateForumPost,
];

const ADMIN: &[Permission] = &[
    Permission::CreateClub,
    Permission::CreateEvent,
    Permission::CreateForumPost,
    Permission::EditClub,
    Permission::ManageClubMembers,
    Permission::EditEvent,
    Permission::ManageEventAttendees,
    Permission::CreateNews,
    Permission::EditNews,
    Permission::ModerateForum,
];

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Everything this role may do. Sent to clients so they can gate their UI.
    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Role::Student => STUDENT,
            Role::Admin => ADMIN,
            Role::SuperAdmin => EVERYTHING,
        }
    }

    pub fn can(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Student
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    /// Unknown role strings fall back to [`Role::Student`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "super_admin" | "superadmin" => Role::SuperAdmin,
            _ => Role::Student,
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a free-text role as stored on user records.
pub fn role_of(s: &str) -> Role {
    s.parse().unwrap_or_default()
}
