//! Static city layout: turns the simulator's character grid into placed
//! scene objects.  Built once at startup; nothing reads back from it.
//!
//! | Symbol | Placement                                        |
//! |--------|--------------------------------------------------|
//! | `i`    | empty road                                       |
//! | `v`    | road, shifted half a tile east                   |
//! | `h`    | road turned 90°, shifted 0.6 tile south          |
//! | `s`    | crossroad turned 270° + stoplight                |
//! | `c`    | stoplight shifted 1.2 tile north                 |
//! | `S`    | crossroad + stoplight turned 90°, half tile east |
//! | `C`    | stoplight turned 90°, half tile east             |
//! | `D`    | destination turned 90°                           |
//! | `#`    | building with a seeded height scale              |
//! | `$`    | empty cell                                       |
//! | other  | skipped; does not take up a column               |
//!
//! Unknown symbols are skipped so that stray characters in a hand-edited
//! map do not shift the rest of the row.  The first text row is the
//! northernmost (largest Z).

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    EmptyRoad,
    Road,
    Crossroad,
    StopLight,
    Destination,
    Building,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub kind: TileKind,
    pub position: Vec3,
    /// Degrees about +Y.
    pub rotation_y: f32,
    /// Vertical scale; 1.0 for everything but buildings.
    pub height_scale: f32,
}

impl Placement {
    fn new(kind: TileKind, position: Vec3, rotation_y: f32) -> Self {
        Self {
            kind,
            position,
            rotation_y,
            height_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CityLayout {
    /// Widest row, in cells.
    pub width: usize,
    /// Number of rows.
    pub depth: usize,
    pub placements: Vec<Placement>,
}

impl CityLayout {
    pub fn parse(text: &str, tile_size: f32, seed: u64) -> Self {
        let rows: Vec<&str> = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .collect();

        let mut layout = CityLayout {
            width: rows
                .iter()
                .map(|r| r.chars().filter(|c| is_tile(*c)).count())
                .max()
                .unwrap_or(0),
            depth: rows.len(),
            placements: Vec::new(),
        };

        let t = tile_size;
        for (row, line) in rows.iter().enumerate() {
            let y = (rows.len() - 1 - row) as f32;
            for (x, symbol) in line.chars().filter(|c| is_tile(*c)).enumerate() {
                let base = Vec3::new(x as f32 * t, 0.0, y * t);
                let east = base + Vec3::new(0.5 * t, 0.0, 0.0);
                let south = base + Vec3::new(0.0, 0.0, -0.6 * t);

                let out = &mut layout.placements;
                match symbol {
                    'i' => out.push(Placement::new(TileKind::EmptyRoad, base, 0.0)),
                    'v' => out.push(Placement::new(TileKind::Road, east, 0.0)),
                    'h' => out.push(Placement::new(TileKind::Road, south, 90.0)),
                    's' => {
                        out.push(Placement::new(TileKind::Crossroad, south, 270.0));
                        out.push(Placement::new(TileKind::StopLight, south, 0.0));
                    }
                    'c' => {
                        let north = base + Vec3::new(0.0, 0.0, 1.2 * t);
                        out.push(Placement::new(TileKind::StopLight, north, 0.0));
                    }
                    'S' => {
                        out.push(Placement::new(TileKind::Crossroad, east, 0.0));
                        out.push(Placement::new(TileKind::StopLight, east, 90.0));
                    }
                    'C' => out.push(Placement::new(TileKind::StopLight, east, 90.0)),
                    'D' => out.push(Placement::new(TileKind::Destination, base, 90.0)),
                    '#' => out.push(Placement {
                        height_scale: building_scale(seed, x as u64, row as u64),
                        ..Placement::new(TileKind::Building, base, 0.0)
                    }),
                    // '$'
                    _ => {}
                }
            }
        }

        layout
    }

    pub fn count(&self, kind: TileKind) -> usize {
        self.placements.iter().filter(|p| p.kind == kind).count()
    }
}

/// Symbols that occupy a grid cell.
fn is_tile(symbol: char) -> bool {
    matches!(symbol, 'i' | 'v' | 'h' | 's' | 'c' | 'S' | 'C' | 'D' | '#' | '$')
}

/// Deterministic height scale in `[0.5, 2.0)` for the building at a cell.
fn building_scale(seed: u64, x: u64, y: u64) -> f32 {
    let mut h = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(x.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(y.wrapping_mul(0xC2B2_AE3D_27D4_EB4F));
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    let unit = (h >> 40) as f32 / (1u64 << 24) as f32;
    0.5 + unit * 1.5
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = "#v$D\nhsSC\ni#c<\n";

    #[test]
    fn counts_rows_and_columns() {
        let city = CityLayout::parse(MAP, 10.0, 42);
        assert_eq!(city.depth, 3);
        assert_eq!(city.width, 4);
    }

    #[test]
    fn first_row_is_north() {
        let city = CityLayout::parse(MAP, 10.0, 42);
        let dest = city
            .placements
            .iter()
            .find(|p| p.kind == TileKind::Destination)
            .unwrap();
        assert_eq!(dest.position, Vec3::new(30.0, 0.0, 20.0));
        assert_eq!(dest.rotation_y, 90.0);
    }

    #[test]
    fn crossroads_carry_stoplights() {
        let city = CityLayout::parse(MAP, 10.0, 42);
        assert_eq!(city.count(TileKind::Crossroad), 2);
        // s, S, C and c.
        assert_eq!(city.count(TileKind::StopLight), 4);
        assert_eq!(city.count(TileKind::Road), 2);
        assert_eq!(city.count(TileKind::EmptyRoad), 1);
    }

    #[test]
    fn offsets_scale_with_tile_size() {
        let city = CityLayout::parse("v\n", 4.0, 0);
        assert_eq!(city.placements[0].position, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn building_heights_are_seeded() {
        let a = CityLayout::parse(MAP, 10.0, 7);
        let b = CityLayout::parse(MAP, 10.0, 7);
        let heights = |c: &CityLayout| -> Vec<f32> {
            c.placements
                .iter()
                .filter(|p| p.kind == TileKind::Building)
                .map(|p| p.height_scale)
                .collect()
        };
        assert_eq!(heights(&a), heights(&b));
        for h in heights(&a) {
            assert!((0.5..2.0).contains(&h));
        }
    }

    #[test]
    fn unknown_symbols_do_not_take_a_column() {
        let city = CityLayout::parse("i?i\n", 10.0, 0);
        assert_eq!(city.width, 2);
        let xs: Vec<f32> = city.placements.iter().map(|p| p.position.x).collect();
        assert_eq!(xs, vec![0.0, 10.0]);
    }

    #[test]
    fn handles_crlf_and_blank_lines() {
        let city = CityLayout::parse("ii\r\n\r\n#i\r\n", 10.0, 1);
        assert_eq!(city.depth, 2);
        assert_eq!(city.count(TileKind::EmptyRoad), 3);
    }
}
