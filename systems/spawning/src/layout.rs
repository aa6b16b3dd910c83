//! Spawn positions for enemy types and clustered groups.

use std::collections::HashMap;

use formation_defence_core::{EnemyType, SpawnPoint};

/// Position used for any enemy type without its own spawn point.
pub const DEFAULT_SPAWN_POINT: SpawnPoint = SpawnPoint::new(-600.0, 600.0);

/// Gap between clustered members when neither the event nor the layout overrides it.
pub const DEFAULT_GROUP_SPACING: f64 = 40.0;

/// Where enemies appear.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnLayout {
    default_point: SpawnPoint,
    per_type: HashMap<EnemyType, SpawnPoint>,
    group_spacing: f64,
}

impl SpawnLayout {
    /// Creates a layout with a shared spawn point and group spacing.
    #[must_use]
    pub fn new(default_point: SpawnPoint, group_spacing: f64) -> Self {
        Self {
            default_point,
            per_type: HashMap::new(),
            group_spacing,
        }
    }

    /// Assigns a dedicated spawn point to `enemy_type`.
    #[must_use]
    pub fn with_type_point(mut self, enemy_type: EnemyType, point: SpawnPoint) -> Self {
        let _ = self.per_type.insert(enemy_type, point);
        self
    }

    /// Spawn point of `enemy_type`.
    #[must_use]
    pub fn point_for(&self, enemy_type: &EnemyType) -> SpawnPoint {
        self.per_type
            .get(enemy_type)
            .copied()
            .unwrap_or(self.default_point)
    }

    /// Default gap between clustered members.
    #[must_use]
    pub const fn group_spacing(&self) -> f64 {
        self.group_spacing
    }

    /// Vertical displacement of member `index` in a group of `size`.
    ///
    /// Manual offsets win; otherwise the group is centred on the spawn point.
    #[must_use]
    pub fn member_offset(
        &self,
        index: u32,
        size: u32,
        offsets: &[f64],
        spacing: Option<f64>,
    ) -> f64 {
        if let Some(offset) = offsets.get(index as usize) {
            return *offset;
        }
        let spacing = spacing.unwrap_or(self.group_spacing);
        let centre = (f64::from(size.max(1)) - 1.0) / 2.0;
        (f64::from(index) - centre) * spacing
    }
}

impl Default for SpawnLayout {
    fn default() -> Self {
        Self::new(DEFAULT_SPAWN_POINT, DEFAULT_GROUP_SPACING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_are_centred() {
        let layout = SpawnLayout::default();
        let offsets: Vec<f64> = (0..3).map(|i| layout.member_offset(i, 3, &[], None)).collect();
        assert_eq!(offsets, vec![-40.0, 0.0, 40.0]);
        assert_eq!(layout.member_offset(1, 2, &[], Some(10.0)), 5.0);
    }

    #[test]
    fn manual_offsets_take_priority() {
        let layout = SpawnLayout::default();
        assert_eq!(layout.member_offset(0, 2, &[7.0], None), 7.0);
        assert_eq!(layout.member_offset(1, 2, &[7.0], None), 20.0);
    }

    #[test]
    fn type_points_override_default() {
        let layout = SpawnLayout::default()
            .with_type_point(EnemyType::tank(), SpawnPoint::new(-700.0, 590.0));
        assert_eq!(layout.point_for(&EnemyType::tank()), SpawnPoint::new(-700.0, 590.0));
        assert_eq!(layout.point_for(&EnemyType::swarm()), DEFAULT_SPAWN_POINT);
    }
}
