//! Tenancy policy: which unit's rows a principal may read or mutate.
use crate::{
    error::Error,
    models::{Admin, AdminRole, Resident},
    Result,
};

/// The set of units a query is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitScope {
    /// Every unit, including rows with no unit at all.
    All,
    /// Exactly one unit.
    Unit(i64),
}

impl UnitScope {
    /// The implicit scope of an admin: all units for a super-admin, the
    /// admin's own unit otherwise.
    pub fn of_admin(admin: &Admin) -> Self {
        match (admin.role, admin.unit_id) {
            (AdminRole::SuperAdmin, _) => Self::All,
            (AdminRole::UnitAdmin, Some(unit)) => Self::Unit(unit),
            // Rejected by a CHECK constraint; fail closed regardless.
            (AdminRole::UnitAdmin, None) => Self::Unit(-1),
        }
    }

    /// Narrow an admin's scope by a client-supplied unit filter.
    ///
    /// Super-admins may name any unit. A unit-admin naming a unit other than
    /// their own is forbidden; the parameter is never trusted to widen scope.
    pub fn for_admin(admin: &Admin, requested: Option<i64>) -> Result<Self> {
        match (Self::of_admin(admin), requested) {
            (Self::All, Some(unit)) => Ok(Self::Unit(unit)),
            (Self::All, None) => Ok(Self::All),
            (Self::Unit(own), Some(unit)) if unit != own => Err(Error::forbidden()),
            (scope @ Self::Unit(_), _) => Ok(scope),
        }
    }

    /// A resident only ever sees their own unit's community content.
    pub fn for_resident(resident: &Resident, requested: Option<i64>) -> Result<i64> {
        match requested {
            Some(unit) if unit != resident.unit_id => Err(Error::forbidden()),
            _ => Ok(resident.unit_id),
        }
    }

    /// Whether a row belonging to `unit` falls inside this scope.
    pub fn permits(self, unit: Option<i64>) -> bool {
        match self {
            Self::All => true,
            Self::Unit(own) => unit == Some(own),
        }
    }

    pub fn unit(self) -> Option<i64> {
        match self {
            Self::All => None,
            Self::Unit(unit) => Some(unit),
        }
    }
}
