//! Query box with autocomplete.
//!
//! Typing looks places up through `/search`; picking a suggestion (click, or
//! Enter for the first one) raises [`PlaceSelected`]. The text is also the
//! query sent with every resync.

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use bevy_egui::{egui, EguiContexts};
use futures_lite::future;

use crate::constants::MAX_SUGGESTIONS;
use crate::info_panel::InfoPanel;
use crate::search::{self, Place, SearchClient};
use crate::sync::PlaceSelected;
use crate::theme;

/// Fewest characters that start a lookup
const MIN_QUERY_LEN: usize = 1;

/// State behind the search box
#[derive(Resource, Default, Debug)]
pub struct SearchBox {
    pub text: String,
    suggestions: Vec<Place>,
    /// Token of the latest suggestion lookup
    issued: u64,
    /// Text the latest lookup was issued for
    requested_text: String,
}

impl SearchBox {
    /// Query text sent with resyncs
    pub fn query(&self) -> &str {
        &self.text
    }

    pub fn suggestions(&self) -> &[Place] {
        &self.suggestions
    }

    /// Token and query for a new lookup if the text changed since the last one.
    ///
    /// Text shorter than the minimum hides the list and invalidates any
    /// lookup still in flight.
    pub fn begin_lookup(&mut self) -> Option<(u64, String)> {
        if self.text == self.requested_text {
            return None;
        }
        self.requested_text = self.text.clone();
        self.issued += 1;

        let query = self.text.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            self.suggestions.clear();
            return None;
        }
        Some((self.issued, query.to_string()))
    }

    /// Show a lookup's results unless a newer lookup was issued since
    pub fn accept(&mut self, token: u64, mut places: Vec<Place>) -> bool {
        if token != self.issued {
            return false;
        }
        places.truncate(MAX_SUGGESTIONS);
        self.suggestions = places;
        true
    }

    /// Take suggestion `index`: fill the box with its label and hide the list
    pub fn select(&mut self, index: usize) -> Option<Place> {
        let place = self.suggestions.get(index).cloned()?;
        self.text = place.suggestion_label();
        self.requested_text = self.text.clone();
        self.suggestions.clear();
        Some(place)
    }

    pub fn dismiss(&mut self) {
        self.suggestions.clear();
    }
}

/// In-flight `/search` lookup
#[derive(Component)]
pub struct SuggestionTask {
    pub token: u64,
    task: Task<search::Result<Vec<Place>>>,
}

/// The query field. Enter reports `true` to take the first suggestion;
/// Escape hides the list. The field has already given up focus by the frame
/// either key arrives, so both check `lost_focus`.
fn search_field(ui: &mut egui::Ui, search_box: &mut SearchBox) -> (egui::Response, bool) {
    let response = ui.add(
        egui::TextEdit::singleline(&mut search_box.text)
            .desired_width(360.0)
            .hint_text("City, state or postal code"),
    );

    let mut entered = false;
    if response.lost_focus() {
        let (enter, escape) =
            ui.input(|i| (i.key_pressed(egui::Key::Enter), i.key_pressed(egui::Key::Escape)));
        if escape {
            search_box.dismiss();
        } else if enter {
            entered = true;
        }
    }
    (response, entered)
}

/// Top bar holding the query box and its suggestion list
pub fn search_box_ui(
    mut commands: Commands,
    mut contexts: EguiContexts,
    mut search_box: ResMut<SearchBox>,
    mut panel: ResMut<InfoPanel>,
    client: Res<SearchClient>,
    mut selected: MessageWriter<PlaceSelected>,
) -> Result {
    let ctx = contexts.ctx_mut()?;
    let mut picked: Option<usize> = None;

    let response = egui::TopBottomPanel::top("search_bar")
        .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::symmetric(12, 8)))
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Search").strong());
                let (response, entered) = search_field(ui, &mut search_box);
                if entered {
                    picked = Some(0);
                }
                response
            })
            .inner
        })
        .inner;

    // Typing in the box hides the article panel
    if response.gained_focus()
        && let Some(anchor) = panel.close()
    {
        debug!("Search focused, closed info panel for {:?}", anchor);
    }

    if response.changed()
        && let Some((token, query)) = search_box.begin_lookup()
    {
        debug!("Suggestion lookup #{} for {:?}", token, query);
        let client = client.clone();
        let task = AsyncComputeTaskPool::get().spawn(async move { client.find_places(&query) });
        commands.spawn(SuggestionTask { token, task });
    }

    if !search_box.suggestions().is_empty() {
        egui::Area::new(egui::Id::new("search_suggestions"))
            .order(egui::Order::Foreground)
            .fixed_pos(response.rect.left_bottom() + egui::vec2(0.0, 4.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_min_width(response.rect.width());
                    for (index, place) in search_box.suggestions().iter().enumerate() {
                        let label = egui::RichText::new(place.suggestion_label());
                        if ui
                            .add(egui::Button::new(label).frame(false))
                            .on_hover_text(format!("{}, {}", place.latitude, place.longitude))
                            .clicked()
                        {
                            picked = Some(index);
                        }
                    }
                    ui.colored_label(
                        theme::MUTED_TEXT,
                        egui::RichText::new("Enter picks the first match").small(),
                    );
                });
            });
    }

    if let Some(index) = picked
        && let Some(place) = search_box.select(index)
    {
        selected.write(PlaceSelected { place });
    }

    Ok(())
}

/// Show suggestion results, ignoring lookups overtaken by newer typing
pub fn poll_suggestion_tasks(
    mut commands: Commands,
    mut search_box: ResMut<SearchBox>,
    mut tasks: Query<(Entity, &mut SuggestionTask)>,
) {
    for (entity, mut task) in tasks.iter_mut() {
        let Some(result) = future::block_on(future::poll_once(&mut task.task)) else {
            continue;
        };
        commands.entity(entity).despawn();

        match result {
            Ok(places) => {
                let count = places.len();
                if !search_box.accept(task.token, places) {
                    debug!("Discarding stale suggestions #{}", task.token);
                } else {
                    debug!("Suggestion lookup #{} returned {} places", task.token, count);
                }
            }
            Err(e) => warn!("Suggestion lookup #{} failed: {}", task.token, e),
        }
    }
}
