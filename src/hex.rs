//! Осевые (axial) координаты гексагональной сетки
//!
//! Карта — шестиугольник радиуса `R` с центром в `(0, 0)`. Все обходы соседей,
//! биты масок и разрешение ничьих используют один и тот же фиксированный
//! порядок направлений [`HexDirection::ALL`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Координата тайла `(q, r)`.
///
/// Порядок сравнения лексический: сначала `q`, затем `r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Axial {
    pub q: i32,
    pub r: i32,
}

impl Axial {
    pub const ORIGIN: Axial = Axial { q: 0, r: 0 };

    #[must_use]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Третья кубическая координата (`q + r + s = 0`).
    #[must_use]
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    /// Расстояние в шагах по сетке.
    #[must_use]
    pub fn distance(self, other: Axial) -> u32 {
        let dq = self.q - other.q;
        let dr = self.r - other.r;
        ((dq.abs() + dr.abs() + (dq + dr).abs()) / 2) as u32
    }

    /// Номер кольца относительно центра карты.
    #[must_use]
    pub fn ring(self) -> u32 {
        self.distance(Self::ORIGIN)
    }

    #[must_use]
    pub fn neighbor(self, direction: HexDirection) -> Axial {
        let (dq, dr) = direction.offset();
        Axial::new(self.q + dq, self.r + dr)
    }

    /// Все шесть соседей в порядке [`HexDirection::ALL`].
    #[must_use]
    pub fn neighbors(self) -> [Axial; 6] {
        HexDirection::ALL.map(|d| self.neighbor(d))
    }

    /// Центр гекса на плоскости (pointy-top, размер ребра = 1).
    #[must_use]
    pub fn to_cartesian(self) -> (f32, f32) {
        let q = self.q as f32;
        let r = self.r as f32;
        (3f32.sqrt() * (q + r * 0.5), 1.5 * r)
    }

    /// Направление к соседу, если `other` действительно соседний тайл.
    #[must_use]
    pub fn direction_to(self, other: Axial) -> Option<HexDirection> {
        HexDirection::ALL
            .into_iter()
            .find(|&d| self.neighbor(d) == other)
    }
}

impl fmt::Display for Axial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}

/// Направление на соседний гекс (pointy-top).
///
/// Индекс направления совпадает с номером бита в масках береговой линии и рек.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HexDirection {
    NorthWest,
    NorthEast,
    East,
    SouthEast,
    SouthWest,
    West,
}

impl HexDirection {
    pub const ALL: [HexDirection; 6] = [
        HexDirection::NorthWest,
        HexDirection::NorthEast,
        HexDirection::East,
        HexDirection::SouthEast,
        HexDirection::SouthWest,
        HexDirection::West,
    ];

    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            HexDirection::NorthWest => (0, -1),
            HexDirection::NorthEast => (1, -1),
            HexDirection::East => (1, 0),
            HexDirection::SouthEast => (0, 1),
            HexDirection::SouthWest => (-1, 1),
            HexDirection::West => (-1, 0),
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Бит направления в 6-битной маске.
    #[must_use]
    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    #[must_use]
    pub const fn opposite(self) -> HexDirection {
        match self {
            HexDirection::NorthWest => HexDirection::SouthEast,
            HexDirection::NorthEast => HexDirection::SouthWest,
            HexDirection::East => HexDirection::West,
            HexDirection::SouthEast => HexDirection::NorthWest,
            HexDirection::SouthWest => HexDirection::NorthEast,
            HexDirection::West => HexDirection::East,
        }
    }

    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            HexDirection::NorthWest => "NW",
            HexDirection::NorthEast => "NE",
            HexDirection::East => "E",
            HexDirection::SouthEast => "SE",
            HexDirection::SouthWest => "SW",
            HexDirection::West => "W",
        }
    }
}

/// Все координаты шестиугольника радиуса `radius`, построчно (`r`, затем `q`).
#[must_use]
pub fn hexagon(radius: u32) -> Vec<Axial> {
    let r_max = radius as i32;
    let mut coords = Vec::with_capacity(tile_count(radius));
    for r in -r_max..=r_max {
        let q_min = (-r_max).max(-r - r_max);
        let q_max = r_max.min(-r + r_max);
        for q in q_min..=q_max {
            coords.push(Axial::new(q, r));
        }
    }
    coords
}

/// Количество тайлов в шестиугольнике: `3R² + 3R + 1`.
#[must_use]
pub const fn tile_count(radius: u32) -> usize {
    let r = radius as usize;
    3 * r * r + 3 * r + 1
}

/// Кольцо тайлов на расстоянии ровно `radius` от `center`.
#[must_use]
pub fn ring(center: Axial, radius: u32) -> Vec<Axial> {
    if radius == 0 {
        return vec![center];
    }
    let mut out = Vec::with_capacity(6 * radius as usize);
    // Стартуем с угла в направлении SW и обходим шесть сторон
    let (dq, dr) = HexDirection::SouthWest.offset();
    let mut current = Axial::new(
        center.q + dq * radius as i32,
        center.r + dr * radius as i32,
    );
    for direction in HexDirection::ALL {
        for _ in 0..radius {
            out.push(current);
            current = current.neighbor(direction);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hexagon_has_expected_tile_count() {
        assert_eq!(hexagon(0).len(), 1);
        assert_eq!(hexagon(5).len(), 91);
        assert_eq!(hexagon(5).len(), tile_count(5));
    }

    #[test]
    fn hexagon_is_row_major() {
        let coords = hexagon(2);
        assert_eq!(coords.first(), Some(&Axial::new(0, -2)));
        assert_eq!(coords.last(), Some(&Axial::new(0, 2)));
        assert!(coords.windows(2).all(|w| (w[0].r, w[0].q) < (w[1].r, w[1].q)));
    }

    #[test]
    fn neighbors_are_at_distance_one_and_opposites_return() {
        let c = Axial::new(2, -1);
        for d in HexDirection::ALL {
            let n = c.neighbor(d);
            assert_eq!(c.distance(n), 1);
            assert_eq!(n.neighbor(d.opposite()), c);
            assert_eq!(c.direction_to(n), Some(d));
        }
    }

    #[test]
    fn ring_contains_exact_distance_tiles() {
        let tiles = ring(Axial::ORIGIN, 3);
        assert_eq!(tiles.len(), 18);
        assert!(tiles.iter().all(|t| t.ring() == 3));
    }

    #[test]
    fn direction_bits_are_distinct() {
        let mask = HexDirection::ALL.iter().fold(0u8, |acc, d| acc | d.bit());
        assert_eq!(mask, 0b11_1111);
    }
}
