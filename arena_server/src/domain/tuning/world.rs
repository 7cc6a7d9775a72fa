use glam::Vec2;

/// Map geometry.
#[derive(Debug, Clone, Copy)]
pub struct WorldTuning {
    pub width: f32,
    pub height: f32,
    /// Players farther than this outside the map die.
    pub out_of_bounds_margin: f32,
    /// Edge length of one block cell.
    pub cell_size: f32,
    /// Stone obstacles scattered in the middle band at room creation.
    pub obstacle_count: usize,
    pub bed_max_hp: i32,
    pub bed_half_extents: Vec2,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            width: 2400.0,
            height: 1600.0,
            out_of_bounds_margin: 100.0,
            cell_size: 40.0,
            obstacle_count: 14,
            bed_max_hp: 500,
            bed_half_extents: Vec2::new(30.0, 20.0),
        }
    }
}
