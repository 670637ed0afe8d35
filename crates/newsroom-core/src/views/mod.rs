//! Role-gated view flow.
//!
//! Views are plain state holders driven by the caller's event loop; rendering
//! is up to the surface embedding them. Navigation always goes through the
//! capability guard, and navigating away drops the outgoing view, which also
//! tears down any live subscriptions it holds; a response resolving after
//! navigation has nothing left to apply to.

pub mod admin;
pub mod detail;
pub mod editor;
pub mod home;

use std::sync::Arc;

pub use admin::AdminView;
pub use detail::{DetailView, LiveEvent, ReactionSummary};
pub use editor::EditorView;
pub use home::HomeView;

use crate::{
    domain::{ArticleId, UserProfile},
    nav::{can_access, Screen},
    ports::LiveChannel,
    repo::Repository,
    Result,
};

/// A navigation request, carrying the article id where one is needed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Home,
    Article(ArticleId),
    Editor,
    Admin,
}

impl Target {
    pub fn screen(self) -> Screen {
        match self {
            Target::Home => Screen::Home,
            Target::Article(_) => Screen::ArticleDetail,
            Target::Editor => Screen::Editor,
            Target::Admin => Screen::Admin,
        }
    }
}

/// What the view layer currently renders.
pub enum ViewState {
    Home(HomeView),
    Detail(DetailView),
    Editor(EditorView),
    Admin(AdminView),
    /// Unauthorized navigation renders an access-denied state instead of
    /// transitioning.
    Denied(Screen),
}

pub struct Flow {
    repo: Repository,
    live: Arc<dyn LiveChannel>,
    viewer: UserProfile,
    page_size: usize,
    state: ViewState,
}

impl Flow {
    /// Start on the home screen.
    pub async fn start(
        repo: Repository,
        live: Arc<dyn LiveChannel>,
        viewer: UserProfile,
        page_size: usize,
    ) -> Result<Self> {
        let home = HomeView::load(&repo, page_size, 0).await?;
        Ok(Self {
            repo,
            live,
            viewer,
            page_size,
            state: ViewState::Home(home),
        })
    }

    pub fn viewer(&self) -> &UserProfile {
        &self.viewer
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ViewState {
        &mut self.state
    }

    /// Guarded transition. A denied target never constructs the view behind
    /// it, so no remote calls are issued on its behalf.
    pub async fn navigate(&mut self, target: Target) -> Result<&ViewState> {
        let screen = target.screen();
        if !can_access(self.viewer.role, screen) {
            self.state = ViewState::Denied(screen);
            return Ok(&self.state);
        }

        self.state = match target {
            Target::Home => {
                ViewState::Home(HomeView::load(&self.repo, self.page_size, 0).await?)
            }
            Target::Article(id) => {
                let mut view = DetailView::open(self.repo.clone(), self.viewer.id, id).await?;
                view.activate(self.live.as_ref()).await?;
                ViewState::Detail(view)
            }
            Target::Editor => {
                ViewState::Editor(EditorView::open(self.repo.clone(), self.viewer.id).await?)
            }
            Target::Admin => ViewState::Admin(AdminView::new(self.repo.clone())),
        };
        Ok(&self.state)
    }
}

/// Deep link for the share action: the app url with the article appended.
pub fn share_link(app_url: &str, article: ArticleId) -> String {
    format!("{app_url}?article={article}")
}
