use crate::{
    domain::{LaunchContext, LaunchUser, Role, UserProfile},
    ports::{DataService, NewProfile},
    Error, Result,
};

/// Resolve a stable profile for the launch-context user, creating one lazily
/// on first sight.
///
/// Repeat logins return the stored row unchanged: display fields from the
/// launch context never overwrite an existing profile, and the role is only
/// ever changed through the admin screen.
pub async fn get_or_create_profile(
    store: &dyn DataService,
    user: &LaunchUser,
) -> Result<UserProfile> {
    if let Some(existing) = store.profile(user.id).await? {
        return Ok(existing);
    }

    let username = user
        .username
        .clone()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| format!("user_{}", user.id.0));

    store
        .insert_profile(NewProfile {
            id: user.id,
            username,
            first_name: user.first_name.clone().unwrap_or_default(),
            last_name: user.last_name.clone().unwrap_or_default(),
            photo_url: user.photo_url.clone(),
            role: Role::User,
        })
        .await
}

/// Authenticate from the launch context handed over by the embedding host.
pub async fn authenticate(store: &dyn DataService, ctx: &LaunchContext) -> Result<UserProfile> {
    let Some(user) = &ctx.user else {
        return Err(Error::Auth(
            "launch context has no user payload".to_string(),
        ));
    };
    get_or_create_profile(store, user).await
}
