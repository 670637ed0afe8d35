use crate::{
    domain::{Role, UserId, UserProfile},
    repo::Repository,
    Result,
};

/// Admin screen: look up users by id or username and assign roles. Reached
/// only through the navigation guard (admin).
pub struct AdminView {
    repo: Repository,
    pub results: Vec<UserProfile>,
}

impl AdminView {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            results: Vec::new(),
        }
    }

    pub async fn search(&mut self, query: &str) -> Result<&[UserProfile]> {
        self.results = self.repo.find_users(query).await?;
        Ok(&self.results)
    }

    /// Assign a role and clear the search state, mirroring the screen's
    /// post-assignment reset.
    pub async fn assign_role(&mut self, user: UserId, role: Role) -> Result<UserProfile> {
        let profile = self.repo.set_role(user, role).await?;
        self.results.clear();
        Ok(profile)
    }
}
