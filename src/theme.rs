//! Centralized color theme for the application.
//!
//! This module provides all colors used for map rendering and the egui overlays.
//! Modify values here to change the application's color scheme.

use bevy::prelude::Color;
use bevy_egui::egui;

// ============================================================================
// Map Colors
// ============================================================================

/// Shown behind tiles that have not loaded (yet)
pub const MAP_BACKGROUND: Color = Color::srgb(0.93, 0.93, 0.91);

// ============================================================================
// Marker Colors
// ============================================================================

/// Red pin head
pub const MARKER_FILL: Color = Color::srgb(0.86, 0.2, 0.18);

/// Darker outline and stem so pins read on light tiles
pub const MARKER_OUTLINE: Color = Color::srgb(0.45, 0.08, 0.06);

/// Pin whose info panel is currently open
pub const MARKER_ACTIVE: Color = Color::srgb(0.2, 0.45, 0.9);

// ============================================================================
// Overlay Colors
// ============================================================================

/// Marker label text
pub const LABEL_TEXT: egui::Color32 = egui::Color32::from_rgb(40, 40, 40);

/// Halo drawn behind marker labels
pub const LABEL_HALO: egui::Color32 = egui::Color32::from_rgba_premultiplied(255, 255, 255, 200);

/// Secondary text in suggestions and panels
pub const MUTED_TEXT: egui::Color32 = egui::Color32::GRAY;

/// Failure notices
pub const ERROR_TEXT: egui::Color32 = egui::Color32::from_rgb(255, 100, 100);
