//! Raster tile layer: downloads the slippy-map tiles covering the viewport
//! and draws them as sprites behind the markers.

use std::collections::{HashMap, HashSet};
use std::io::Read;

use bevy::asset::RenderAssetUsages;
use bevy::math::DVec2;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::tasks::{AsyncComputeTaskPool, Task};
use futures_lite::future;

use crate::config::AppConfig;
use crate::constants::{MAX_TILE_BYTES, MAX_TILE_FETCHES_PER_FRAME};
use crate::geo::TILE_SIZE;
use crate::search::build_agent;

use super::{MapOptions, Viewport};

/// Tiles sit at the back; markers are drawn over them
const TILE_Z: f32 = -10.0;

/// Address of one tile. `x` is not wrapped so tiles left and right of the
/// antimeridian can be placed side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: i64,
    pub y: i64,
}

impl TileCoord {
    /// Column as served by the tile server
    pub fn wrapped_x(&self) -> i64 {
        let n = 1i64 << self.z;
        self.x.rem_euclid(n)
    }

    /// Fill a URL template. `{s}` rotates through the usual a-d subdomains.
    pub fn url(&self, template: &str) -> String {
        let x = self.wrapped_x();
        let subdomain = ["a", "b", "c", "d"][((x + self.y).rem_euclid(4)) as usize];
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &self.y.to_string())
            .replace("{s}", subdomain)
            .replace("{r}", "")
    }

    /// World pixel of the tile's center
    fn center_pixel(&self) -> DVec2 {
        DVec2::new(
            (self.x as f64 + 0.5) * TILE_SIZE,
            (self.y as f64 + 0.5) * TILE_SIZE,
        )
    }
}

/// Local position of a tile's center
pub fn tile_position(viewport: &Viewport, coord: TileCoord) -> Vec2 {
    viewport.pixel_offset(coord.center_pixel())
}

/// Tiles needed to cover the viewport, nearest the center first
pub fn visible_tiles(viewport: &Viewport) -> Vec<TileCoord> {
    let zoom = viewport.zoom();
    let rows = 1i64 << zoom;
    let center_px = crate::geo::project(viewport.center(), zoom);
    let half = (viewport.size() / 2.0).as_dvec2();

    let min_x = ((center_px.x - half.x) / TILE_SIZE).floor() as i64;
    let max_x = ((center_px.x + half.x) / TILE_SIZE).floor() as i64;
    let min_y = (((center_px.y - half.y) / TILE_SIZE).floor() as i64).max(0);
    let max_y = (((center_px.y + half.y) / TILE_SIZE).floor() as i64).min(rows - 1);

    let mut tiles: Vec<TileCoord> = (min_y..=max_y)
        .flat_map(|y| (min_x..=max_x).map(move |x| TileCoord { z: zoom, x, y }))
        .collect();

    tiles.sort_by(|a, b| {
        let da = a.center_pixel().distance_squared(center_px);
        let db = b.center_pixel().distance_squared(center_px);
        da.total_cmp(&db)
    });
    tiles
}

/// Tiles currently spawned, plus those that failed at this zoom level
#[derive(Resource, Default)]
pub struct TileLayer {
    pub zoom: Option<u8>,
    pub tiles: HashMap<TileCoord, Entity>,
    pub failed: HashSet<TileCoord>,
    agent: Option<ureq::Agent>,
}

impl TileLayer {
    /// Forget tiles outside `wanted`, including failed ones. Returns the
    /// entities of the dropped tiles.
    pub fn retain_wanted(&mut self, wanted: &HashSet<TileCoord>) -> Vec<Entity> {
        let mut dropped = Vec::new();
        self.tiles.retain(|coord, entity| {
            let keep = wanted.contains(coord);
            if !keep {
                dropped.push(*entity);
            }
            keep
        });
        self.failed.retain(|coord| wanted.contains(coord));
        dropped
    }
}

/// A tile on the map. Its sprite is attached once the download finishes.
#[derive(Component)]
pub struct MapTile {
    pub coord: TileCoord,
}

/// Background download for one tile
#[derive(Component)]
pub struct TileFetchTask(Task<Result<Image, String>>);

/// Download and decode one tile into a texture
fn fetch_tile(url: &str, agent: &ureq::Agent) -> Result<Image, String> {
    let response = agent
        .get(url)
        .call()
        .map_err(|e| format!("request error: {}", e))?;

    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_TILE_BYTES)
        .read_to_end(&mut bytes)
        .map_err(|e| format!("failed to read tile: {}", e))?;

    let rgba = image::load_from_memory(&bytes)
        .map_err(|e| format!("failed to decode tile: {}", e))?
        .into_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(Image::new(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        rgba.into_raw(),
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
    ))
}

/// Spawn tiles entering the view and despawn those that left it
pub fn update_tiles(
    mut commands: Commands,
    viewport: Res<Viewport>,
    options: Res<MapOptions>,
    config: Res<AppConfig>,
    mut layer: ResMut<TileLayer>,
) {
    let zoom = viewport.zoom();

    if layer.zoom != Some(zoom) {
        for (_, entity) in layer.tiles.drain() {
            commands.entity(entity).despawn();
        }
        layer.failed.clear();
        layer.zoom = Some(zoom);
    }

    let wanted = visible_tiles(&viewport);
    let wanted_set: HashSet<TileCoord> = wanted.iter().copied().collect();

    for entity in layer.retain_wanted(&wanted_set) {
        commands.entity(entity).despawn();
    }

    let missing: Vec<TileCoord> = wanted
        .into_iter()
        .filter(|coord| !layer.tiles.contains_key(coord) && !layer.failed.contains(coord))
        .take(MAX_TILE_FETCHES_PER_FRAME)
        .collect();

    if missing.is_empty() {
        return;
    }

    let agent = layer
        .agent
        .get_or_insert_with(|| build_agent(config.data.request_timeout()))
        .clone();
    let task_pool = AsyncComputeTaskPool::get();

    for coord in missing {
        let url = coord.url(&options.tile_url);
        let agent = agent.clone();
        let task = task_pool.spawn(async move { fetch_tile(&url, &agent) });

        let local = tile_position(&viewport, coord);
        let entity = commands
            .spawn((
                MapTile { coord },
                TileFetchTask(task),
                Transform::from_translation(local.extend(TILE_Z)),
                Visibility::default(),
            ))
            .id();
        layer.tiles.insert(coord, entity);
    }
}

/// Attach finished tile textures
pub fn poll_tile_tasks(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    mut layer: ResMut<TileLayer>,
    mut tasks: Query<(Entity, &MapTile, &mut TileFetchTask)>,
) {
    for (entity, tile, mut task) in tasks.iter_mut() {
        let Some(result) = future::block_on(future::poll_once(&mut task.0)) else {
            continue;
        };

        match result {
            Ok(image) => {
                let handle = images.add(image);
                let mut sprite = Sprite::from_image(handle);
                sprite.custom_size = Some(Vec2::splat(TILE_SIZE as f32));
                commands
                    .entity(entity)
                    .remove::<TileFetchTask>()
                    .insert(sprite);
            }
            Err(e) => {
                debug!("Tile {:?} unavailable: {}", tile.coord, e);
                layer.failed.insert(tile.coord);
                commands.entity(entity).remove::<TileFetchTask>();
            }
        }
    }
}

/// Move tiles after the viewport changed
pub fn position_tiles(viewport: Res<Viewport>, mut tiles: Query<(&MapTile, &mut Transform)>) {
    for (tile, mut transform) in tiles.iter_mut() {
        if tile.coord.z != viewport.zoom() {
            continue;
        }
        let local = tile_position(&viewport, tile.coord);
        transform.translation = local.extend(TILE_Z);
    }
}
