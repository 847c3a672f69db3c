/// Decoration detail level; 0 is full detail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lod {
    Full = 0,
    Half = 1,
    Quarter = 2,
    Sparse = 3,
}

impl Lod {
    pub const ALL: [Lod; 4] = [Lod::Full, Lod::Half, Lod::Quarter, Lod::Sparse];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Band for a chunk `dist` rings from the viewer. `bands` are fractions of
    /// the view distance marking the outer edge of the first three levels.
    pub fn for_distance(dist: u32, view_distance: u32, bands: &[f64; 3]) -> Lod {
        let d = f64::from(dist);
        let r = f64::from(view_distance);
        for (i, frac) in bands.iter().enumerate() {
            if d <= r * frac {
                return Lod::ALL[i];
            }
        }
        Lod::Sparse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANDS: [f64; 3] = [0.4, 0.6, 0.8];

    #[test]
    fn bands_for_view_five() {
        let got: Vec<Lod> = (0..=5).map(|d| Lod::for_distance(d, 5, &BANDS)).collect();
        assert_eq!(
            got,
            vec![Lod::Full, Lod::Full, Lod::Full, Lod::Half, Lod::Quarter, Lod::Sparse]
        );
    }

    #[test]
    fn view_one_is_full_then_sparse() {
        assert_eq!(Lod::for_distance(0, 1, &BANDS), Lod::Full);
        assert_eq!(Lod::for_distance(1, 1, &BANDS), Lod::Sparse);
    }
}
