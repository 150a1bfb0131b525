use crate::state::SimState;

/// Ordering of the flat force and velocity vectors.
///
/// Force side: `[F_a (3N); T_a (3N); S_a (5N); F_b (3M); DF_b (3M)]`.
/// Velocity side: `[U_a; O_a; E_a; U_b; HalfDU_b]`.
///
/// A reordered system keeps these slot positions; only which of the pair
/// (force, velocity) a slot holds changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DofLayout {
    pub num_spheres: usize,
    pub num_dumbbells: usize,
}

impl DofLayout {
    pub fn new(num_spheres: usize, num_dumbbells: usize) -> Self {
        DofLayout {
            num_spheres,
            num_dumbbells,
        }
    }

    pub fn of(state: &SimState) -> Self {
        Self::new(state.spheres.len(), state.dumbbells.len())
    }

    pub fn size(&self) -> usize {
        11 * self.num_spheres + 6 * self.num_dumbbells
    }

    pub fn sphere_force(&self, i: usize) -> usize {
        3 * i
    }

    pub fn sphere_torque(&self, i: usize) -> usize {
        3 * self.num_spheres + 3 * i
    }

    pub fn sphere_stresslet(&self, i: usize) -> usize {
        6 * self.num_spheres + 5 * i
    }

    // First dumbbell slot. Everything from here on belongs to dumbbells.
    pub fn dumbbell_start(&self) -> usize {
        11 * self.num_spheres
    }

    pub fn dumbbell_force(&self, i: usize) -> usize {
        self.dumbbell_start() + 3 * i
    }

    pub fn dumbbell_force_difference(&self, i: usize) -> usize {
        self.dumbbell_start() + 3 * self.num_dumbbells + 3 * i
    }

    pub fn stresslet_slots(&self) -> Vec<usize> {
        (6 * self.num_spheres..11 * self.num_spheres).collect()
    }

    // Force slots of the first `n` spheres.
    pub fn leading_sphere_force_slots(&self, n: usize) -> Vec<usize> {
        (0..3 * n).collect()
    }

    // Force and force-difference slots of the first `n` dumbbells.
    pub fn leading_dumbbell_slots(&self, n: usize) -> Vec<usize> {
        (0..n)
            .flat_map(|i| {
                let f = self.dumbbell_force(i);
                let df = self.dumbbell_force_difference(i);
                (f..f + 3).chain(df..df + 3)
            })
            .collect()
    }
}
