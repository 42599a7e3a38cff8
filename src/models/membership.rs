use mongodb::bson::oid::ObjectId;

use crate::utils::AppError;

/// Group with an admin and a member list (communities and organizations).
///
/// The admin is always a member and can never leave.
pub trait Membership {
    /// Label used in error messages, e.g. "community".
    const KIND: &'static str;

    fn admin(&self) -> &ObjectId;
    fn members(&self) -> &[ObjectId];

    fn is_admin(&self, user: &ObjectId) -> bool {
        self.admin() == user
    }

    fn is_member(&self, user: &ObjectId) -> bool {
        self.is_admin(user) || self.members().contains(user)
    }

    fn ensure_can_join(&self, user: &ObjectId) -> Result<(), AppError> {
        if self.is_member(user) {
            return Err(AppError::Validation(format!(
                "You are already a member of this {}",
                Self::KIND
            )));
        }
        Ok(())
    }

    fn ensure_can_leave(&self, user: &ObjectId) -> Result<(), AppError> {
        if self.is_admin(user) {
            return Err(AppError::Validation(format!(
                "Admin cannot leave their own {}",
                Self::KIND
            )));
        }
        if !self.members().contains(user) {
            return Err(AppError::Validation(format!(
                "You are not a member of this {}",
                Self::KIND
            )));
        }
        Ok(())
    }
}

/// Member list for a newly created group: the admin first, no duplicates.
pub fn initial_members(admin: ObjectId, extra: impl IntoIterator<Item = ObjectId>) -> Vec<ObjectId> {
    let mut members = vec![admin];
    for id in extra {
        if !members.contains(&id) {
            members.push(id);
        }
    }
    members
}
