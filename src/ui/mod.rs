mod map_controls;
mod search_box;

pub use search_box::SearchBox;

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

use crate::config::{AppConfig, ConfigResetNotification};

/// Tells the user their config file could not be read and was replaced
fn config_reset_notification_ui(
    mut contexts: EguiContexts,
    mut notification: ResMut<ConfigResetNotification>,
    config: Res<AppConfig>,
) -> Result {
    if !notification.show {
        return Ok(());
    }

    let mut dismissed = false;

    egui::Window::new("Configuration Reset")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(contexts.ctx_mut()?, |ui| {
            ui.label("Your configuration file could not be read and has been reset to defaults.");
            ui.add_space(8.0);

            if let Some(reason) = &notification.reason {
                ui.label(egui::RichText::new(reason).weak());
                ui.add_space(8.0);
            }

            ui.label(
                egui::RichText::new(config.config_path.to_string_lossy().to_string())
                    .small()
                    .weak(),
            );
            ui.add_space(12.0);

            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });

    if dismissed {
        notification.show = false;
        notification.reason = None;
    }

    Ok(())
}

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SearchBox>()
            .add_systems(Update, search_box::poll_suggestion_tasks)
            // The top bar must render before the map overlays so they fit below it
            .add_systems(
                EguiPrimaryContextPass,
                (
                    search_box::search_box_ui,
                    map_controls::map_controls_ui,
                    config_reset_notification_ui,
                )
                    .chain(),
            );
    }
}
