//! Накопительные теги тайла
//!
//! Теги только добавляются и никогда не снимаются. Хранятся как битовое
//! множество: правила в [`crate::terrain`] проверяют вхождение, а не порядок.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TagSet: u16 {
        /// Затоплено океаном от края карты.
        const OCEAN = 1 << 0;
        /// Океанский тайл, граничащий с сушей.
        const COASTLINE = 1 << 1;
        /// Тайл суши, граничащий с океаном.
        const SHORE = 1 << 2;
        /// Сушеобразующий тайл — блокирует затопление.
        const LANDMASS = 1 << 3;
        const SPINE = 1 << 4;
        const LAKE = 1 << 5;
        const MOUNTAIN = 1 << 6;
        const FOOTHILLS = 1 << 7;
        const LOWLANDS = 1 << 8;
        const WINDWARD = 1 << 9;
        const LEEWARD = 1 << 10;
        const CENTRAL_DESERT = 1 << 11;
        const SCRUBLAND = 1 << 12;
    }
}

impl TagSet {
    /// Имена установленных тегов в порядке объявления (для экспорта).
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }

    #[must_use]
    pub fn is_ocean(self) -> bool {
        self.contains(TagSet::OCEAN)
    }

    /// Суша в широком смысле: всё, что не океан и не озеро.
    #[must_use]
    pub fn is_dry_land(self) -> bool {
        !self.intersects(TagSet::OCEAN | TagSet::LAKE)
    }
}
