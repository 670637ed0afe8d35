use crate::domain::Role;

/// Screens reachable from the bottom navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Screen {
    Home,
    ArticleDetail,
    Editor,
    Admin,
}

/// Single capability policy consulted by the navigation guard.
///
/// The editor screen requires editor or admin; the admin screen requires
/// admin. Everything else is free-form.
pub fn can_access(role: Role, screen: Screen) -> bool {
    match screen {
        Screen::Home | Screen::ArticleDetail => true,
        Screen::Editor => role >= Role::Editor,
        Screen::Admin => role >= Role::Admin,
    }
}
