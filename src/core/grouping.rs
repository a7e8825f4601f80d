use crate::core::scene::Scene;
use log::{debug, info};
use std::collections::BTreeMap;

/// All scenes sharing one WRS (path, row) footprint.
///
/// The reference is the earliest acquisition in the group; everything else
/// is registered against it.
#[derive(Debug, Clone)]
pub struct TileGroup {
    pub path: u16,
    pub row: u16,
    pub reference: Scene,
    pub targets: Vec<Scene>,
}

impl TileGroup {
    /// Number of scenes in the group including the reference
    pub fn len(&self) -> usize {
        self.targets.len() + 1
    }

    /// Never true for a constructed group, which always carries its reference
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition scenes by (path, row) and elect a reference per tile.
///
/// Scenes within one tile are ordered by acquisition date, oldest first;
/// ties on the date fall back to the scene name so the election is
/// deterministic. Groups come back ordered by tile key. A tile with a single
/// scene still forms a group, it just has nothing to register.
pub fn group_scenes(scenes: Vec<Scene>) -> Vec<TileGroup> {
    let mut tiles: BTreeMap<(u16, u16), Vec<Scene>> = BTreeMap::new();
    for scene in scenes {
        tiles.entry(scene.id.tile()).or_default().push(scene);
    }

    let mut groups = Vec::with_capacity(tiles.len());
    for ((path, row), mut members) in tiles {
        members.sort_by(|a, b| {
            a.id.acquired
                .cmp(&b.id.acquired)
                .then_with(|| a.id.name.cmp(&b.id.name))
        });

        let mut iter = members.into_iter();
        let reference = match iter.next() {
            Some(scene) => scene,
            None => continue,
        };
        let targets: Vec<Scene> = iter.collect();

        info!(
            "Tile {:03}/{:03}: reference {} ({}), {} target(s)",
            path,
            row,
            reference.id,
            reference.id.acquired,
            targets.len()
        );
        for target in &targets {
            debug!("  target {} ({})", target.id, target.id.acquired);
        }

        groups.push(TileGroup {
            path,
            row,
            reference,
            targets,
        });
    }

    groups
}
