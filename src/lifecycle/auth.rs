//! Authorization for index management
//!
//! The decision engine owns users and policies; the lifecycle only needs
//! a yes/no for "may this caller prepare indexes on this organization".

use uuid::Uuid;

use super::errors::{LifecycleError, LifecycleResult};

/// Role of the caller within its organization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Read-only access
    Viewer,
    /// Can edit scenarios
    Builder,
    /// Can publish scenarios
    Publisher,
    /// Organization administrator
    Admin,
    /// Internal service account, any organization
    Service,
}

/// Caller identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Organization the caller belongs to
    pub org_id: Uuid,
    /// Caller's role
    pub role: Role,
}

impl Credentials {
    /// Create credentials
    pub fn new(org_id: Uuid, role: Role) -> Self {
        Self { org_id, role }
    }

    /// Service credentials, used by background workers
    pub fn service() -> Self {
        Self {
            org_id: Uuid::nil(),
            role: Role::Service,
        }
    }
}

/// Decides whether a caller may manage an organization's indexes
pub trait IndexPermissions: Send + Sync {
    /// `Ok(())` when allowed, `LifecycleError::Unauthorized` otherwise
    fn can_manage_indexes(&self, credentials: &Credentials, org_id: Uuid) -> LifecycleResult<()>;
}

/// Default policy: publishers and admins of the organization, or service
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePermissions;

impl IndexPermissions for RolePermissions {
    fn can_manage_indexes(&self, credentials: &Credentials, org_id: Uuid) -> LifecycleResult<()> {
        let allowed = match credentials.role {
            Role::Service => true,
            Role::Publisher | Role::Admin => credentials.org_id == org_id,
            Role::Viewer | Role::Builder => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(LifecycleError::Unauthorized(org_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_of_own_org_allowed() {
        let org = Uuid::new_v4();
        let creds = Credentials::new(org, Role::Publisher);
        assert!(RolePermissions.can_manage_indexes(&creds, org).is_ok());
    }

    #[test]
    fn test_other_org_denied() {
        let creds = Credentials::new(Uuid::new_v4(), Role::Admin);
        let other = Uuid::new_v4();
        let err = RolePermissions.can_manage_indexes(&creds, other).unwrap_err();
        assert!(matches!(err, LifecycleError::Unauthorized(id) if id == other));
    }

    #[test]
    fn test_builder_denied() {
        let org = Uuid::new_v4();
        let creds = Credentials::new(org, Role::Builder);
        assert!(RolePermissions.can_manage_indexes(&creds, org).is_err());
    }

    #[test]
    fn test_service_allowed_everywhere() {
        assert!(RolePermissions
            .can_manage_indexes(&Credentials::service(), Uuid::new_v4())
            .is_ok());
    }
}
