//! The single info panel shared by all markers.
//!
//! At most one marker owns the panel at a time. Opening it for another marker
//! closes the current owner first; article results that come back for a marker
//! that no longer owns the panel are dropped.

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use futures_lite::future;

use crate::constants::MAX_ARTICLES;
use crate::map::MapCursor;
use crate::markers::{head_offset, MarkerClicked, PlaceMarker};
use crate::search::{Article, SearchClient, SearchError};
use crate::theme;

/// One rendered article: link text and target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleLink {
    pub text: String,
    pub href: String,
}

/// What the panel is showing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InfoContent {
    /// Placeholder while articles are fetched
    #[default]
    Loading,
    Articles(Vec<ArticleLink>),
    /// The fetch failed; the string is shown to the user
    Unavailable(String),
}

/// The first [`MAX_ARTICLES`] articles as links, fewer if fewer were returned
pub fn article_links(articles: &[Article]) -> Vec<ArticleLink> {
    articles
        .iter()
        .take(MAX_ARTICLES)
        .map(|article| ArticleLink {
            text: article.title.clone(),
            href: article.link.clone(),
        })
        .collect()
}

#[derive(Resource, Default, Debug)]
pub struct InfoPanel {
    anchor: Option<Entity>,
    content: InfoContent,
}

impl InfoPanel {
    pub fn is_open(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn anchor(&self) -> Option<Entity> {
        self.anchor
    }

    pub fn content(&self) -> &InfoContent {
        &self.content
    }

    /// Show the panel at `anchor`. `None` shows the loading placeholder.
    ///
    /// Does not close a panel open elsewhere; callers do that with [`close`](Self::close).
    pub fn show(&mut self, anchor: Entity, content: Option<InfoContent>) {
        self.anchor = Some(anchor);
        self.content = content.unwrap_or_default();
    }

    /// Hide the panel. Returns the marker it was anchored to.
    pub fn close(&mut self) -> Option<Entity> {
        self.content = InfoContent::Loading;
        self.anchor.take()
    }

    /// Close the current panel, then open a loading panel at `anchor`.
    /// Returns the marker whose panel was closed.
    pub fn reopen_at(&mut self, anchor: Entity) -> Option<Entity> {
        let previous = self.close();
        self.show(anchor, None);
        previous
    }

    /// Replace the content if the panel is still anchored at `anchor`
    pub fn update_content(&mut self, anchor: Entity, content: InfoContent) -> bool {
        if self.anchor != Some(anchor) {
            return false;
        }
        self.content = content;
        true
    }
}

/// Background article lookup for the marker that opened the panel
#[derive(Component)]
pub struct ArticleTask {
    pub anchor: Entity,
    task: Task<Result<Vec<Article>, SearchError>>,
}

/// Content to show once an article lookup finished
fn content_for(result: Result<Vec<Article>, SearchError>) -> InfoContent {
    match result {
        Ok(articles) => InfoContent::Articles(article_links(&articles)),
        Err(e) => {
            warn!("Article lookup failed: {}", e);
            InfoContent::Unavailable("Articles are unavailable right now.".to_string())
        }
    }
}

/// Open the panel in its loading state and start fetching articles
fn open_panel_on_click(
    mut commands: Commands,
    mut clicks: MessageReader<MarkerClicked>,
    mut panel: ResMut<InfoPanel>,
    markers: Query<&PlaceMarker>,
    client: Res<SearchClient>,
) {
    let task_pool = AsyncComputeTaskPool::get();

    for click in clicks.read() {
        let Ok(marker) = markers.get(click.marker) else {
            continue;
        };

        if let Some(previous) = panel.reopen_at(click.marker) {
            debug!("Closed info panel for {:?}", previous);
        }

        let postal_code = marker.place.postal_code.clone();
        debug!("Fetching articles for {} ({})", marker.label, postal_code);

        let client = client.clone();
        let task = task_pool.spawn(async move { client.find_articles(&postal_code) });
        commands.spawn(ArticleTask {
            anchor: click.marker,
            task,
        });
    }
}

/// Fill the panel when its article lookup finishes
fn poll_article_tasks(
    mut commands: Commands,
    mut panel: ResMut<InfoPanel>,
    mut tasks: Query<(Entity, &mut ArticleTask)>,
) {
    for (entity, mut task) in tasks.iter_mut() {
        let Some(result) = future::block_on(future::poll_once(&mut task.task)) else {
            continue;
        };

        if !panel.update_content(task.anchor, content_for(result)) {
            debug!("Dropping articles for {:?}: panel moved on", task.anchor);
        }

        commands.entity(entity).despawn();
    }
}

fn article_list(ui: &mut egui::Ui, links: &[ArticleLink]) {
    if links.is_empty() {
        ui.colored_label(theme::MUTED_TEXT, "No articles found.");
        return;
    }

    for link in links {
        ui.horizontal(|ui| {
            ui.label("•");
            if ui.link(link.text.as_str()).on_hover_text(link.href.as_str()).clicked()
                && let Err(e) = open::that(&link.href)
            {
                warn!("Failed to open {}: {}", link.href, e);
            }
        });
    }
}

/// Draw the panel next to its marker
fn info_panel_ui(
    mut contexts: EguiContexts,
    mut panel: ResMut<InfoPanel>,
    cursor: MapCursor,
    markers: Query<(&Transform, &PlaceMarker)>,
) -> Result {
    let Some(anchor) = panel.anchor() else {
        return Ok(());
    };
    let Ok((transform, marker)) = markers.get(anchor) else {
        return Ok(());
    };
    let head = transform.translation.truncate() + head_offset();
    let Some(screen_pos) = cursor.local_to_screen(head) else {
        return Ok(());
    };

    let ctx = contexts.ctx_mut()?;
    let mut open = true;

    egui::Window::new(marker.label.as_str())
        .id(egui::Id::new("info_panel"))
        .pivot(egui::Align2::CENTER_BOTTOM)
        .fixed_pos(egui::pos2(screen_pos.x, screen_pos.y - 12.0))
        .collapsible(false)
        .resizable(false)
        .open(&mut open)
        .show(ctx, |ui| {
            ui.set_max_width(320.0);
            match panel.content() {
                InfoContent::Loading => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading articles...");
                    });
                }
                InfoContent::Articles(links) => article_list(ui, links),
                InfoContent::Unavailable(reason) => {
                    ui.colored_label(theme::ERROR_TEXT, reason.as_str());
                }
            }
        });

    if !open {
        panel.close();
    }

    Ok(())
}

pub struct InfoPanelPlugin;

impl Plugin for InfoPanelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InfoPanel>()
            .add_systems(
                Update,
                (
                    open_panel_on_click.run_if(on_message::<MarkerClicked>),
                    poll_article_tasks,
                )
                    .chain(),
            )
            .add_systems(EguiPrimaryContextPass, info_panel_ui);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn articles(count: usize) -> Vec<Article> {
        (0..count)
            .map(|i| Article {
                title: format!("Story {}", i),
                link: format!("https://news.example/{}", i),
            })
            .collect()
    }

    fn entities(count: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..count).map(|_| world.spawn_empty().id()).collect()
    }

    #[test]
    fn test_article_links_clamped_to_five() {
        assert_eq!(article_links(&articles(12)).len(), 5);
        assert_eq!(article_links(&articles(5)).len(), 5);
    }

    #[test]
    fn test_article_links_fewer_than_five() {
        let links = article_links(&articles(2));
        assert_eq!(links.len(), 2);
        assert!(article_links(&[]).is_empty());
    }

    #[test]
    fn test_article_link_text_and_target() {
        let links = article_links(&articles(3));
        assert_eq!(links[1].text, "Story 1");
        assert_eq!(links[1].href, "https://news.example/1");
    }

    #[test]
    fn test_show_without_content_is_loading() {
        let anchor = entities(1)[0];
        let mut panel = InfoPanel::default();
        assert!(!panel.is_open());

        panel.show(anchor, None);
        assert!(panel.is_open());
        assert_eq!(panel.anchor(), Some(anchor));
        assert_eq!(panel.content(), &InfoContent::Loading);
    }

    #[test]
    fn test_show_with_content_renders_it() {
        let anchor = entities(1)[0];
        let mut panel = InfoPanel::default();
        let content = InfoContent::Articles(article_links(&articles(1)));
        panel.show(anchor, Some(content.clone()));
        assert_eq!(panel.content(), &content);
    }

    #[test]
    fn test_reopen_closes_previous_first() {
        let e = entities(2);
        let mut panel = InfoPanel::default();

        assert_eq!(panel.reopen_at(e[0]), None);
        panel.update_content(e[0], InfoContent::Articles(vec![]));

        let closed = panel.reopen_at(e[1]);
        assert_eq!(closed, Some(e[0]));
        assert_eq!(panel.anchor(), Some(e[1]));
        assert_eq!(panel.content(), &InfoContent::Loading);
    }

    #[test]
    fn test_close_returns_anchor() {
        let anchor = entities(1)[0];
        let mut panel = InfoPanel::default();
        panel.show(anchor, None);
        assert_eq!(panel.close(), Some(anchor));
        assert!(!panel.is_open());
        assert_eq!(panel.close(), None);
    }

    #[test]
    fn test_stale_articles_are_dropped() {
        let e = entities(2);
        let mut panel = InfoPanel::default();
        panel.reopen_at(e[0]);
        panel.reopen_at(e[1]);

        // Results for the first marker arrive after the second was opened
        let stale = InfoContent::Articles(article_links(&articles(3)));
        assert!(!panel.update_content(e[0], stale));
        assert_eq!(panel.content(), &InfoContent::Loading);

        let fresh = InfoContent::Articles(article_links(&articles(1)));
        assert!(panel.update_content(e[1], fresh.clone()));
        assert_eq!(panel.content(), &fresh);
    }

    #[test]
    fn test_failed_lookup_shows_unavailable() {
        let content = content_for(Err(SearchError::Status {
            endpoint: "articles",
            status: 502,
        }));
        assert!(matches!(content, InfoContent::Unavailable(_)));

        let content = content_for(Ok(articles(7)));
        assert_eq!(content, InfoContent::Articles(article_links(&articles(5))));
    }
}
