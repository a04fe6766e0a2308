/// Per-document unit conversion factors.
///
/// All polygon coordinates are stored in *database units*. `database_unit_m`
/// is the number of metres one database unit represents (e.g. `1e-9` for a
/// 1 nm grid); `user_unit_m` is the number of metres one "user" unit
/// represents (e.g. `1e-6` for micrometres). The ratio of the two converts
/// database-unit coordinates to µm for the UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Units {
    pub database_unit_m: f64,
    pub user_unit_m: f64,
}

impl Units {
    pub fn new(database_unit_m: f64, user_unit_m: f64) -> Self {
        Self { database_unit_m, user_unit_m }
    }

    /// Database units per user unit.
    pub fn db_per_user_unit(&self) -> f64 {
        self.user_unit_m / self.database_unit_m
    }

    /// Converts a length in database units to micrometres.
    pub fn db_to_um(&self, db: f64) -> f64 {
        db * self.database_unit_m * 1.0e6
    }

    /// Converts a length in micrometres to database units.
    pub fn um_to_db(&self, um: f64) -> f64 {
        um * 1.0e-6 / self.database_unit_m
    }
}

impl Default for Units {
    /// A 1 nm database grid with a 1 µm user unit — the common GDSII default.
    fn default() -> Self {
        Self { database_unit_m: 1.0e-9, user_unit_m: 1.0e-6 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_um_to_db() {
        let units = Units::default();
        let um = 12.345;
        let db = units.um_to_db(um);
        assert!((units.db_to_um(db) - um).abs() < 1.0e-9);
    }

    #[test]
    fn db_per_user_unit_is_ratio() {
        let units = Units::new(1.0e-9, 1.0e-6);
        assert!((units.db_per_user_unit() - 1000.0).abs() < 1.0e-9);
    }
}
