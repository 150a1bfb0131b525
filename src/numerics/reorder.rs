use nalgebra::DMatrix;

use crate::{
    config::setup::parameters::simulation::InputForm,
    error::{NumericalInstabilityError, StokesResult},
};

use super::{interface::MatrixReordering, layout::DofLayout};

/// Exchange the known/unknown roles of the slots in `pivot`.
///
/// Given `y = A x`, returns `M` with `y' = M x'`, where `x'` is `x` with the
/// pivot slots replaced by the matching entries of `y`, and `y'` is `y` with
/// the pivot slots replaced by the matching entries of `x`. `None` if the
/// pivot block of `A` is singular.
pub fn principal_pivot(a: &DMatrix<f64>, pivot: &[usize]) -> Option<DMatrix<f64>> {
    if pivot.is_empty() {
        return Some(a.clone());
    }
    let n = a.nrows();
    let mut in_pivot = vec![false; n];
    for &j in pivot {
        in_pivot[j] = true;
    }
    let rest: Vec<usize> = (0..n).filter(|i| !in_pivot[*i]).collect();

    let a_jj_inv = a
        .select_rows(pivot.iter())
        .select_columns(pivot.iter())
        .try_inverse()?;
    let a_ij = a.select_rows(rest.iter()).select_columns(pivot.iter());
    let a_ji = a.select_rows(pivot.iter()).select_columns(rest.iter());
    let a_ii = a.select_rows(rest.iter()).select_columns(rest.iter());

    let m_ij = &a_ij * &a_jj_inv;
    let m_ii = a_ii - &m_ij * &a_ji;
    let m_ji = -(&a_jj_inv * &a_ji);

    let mut m = DMatrix::zeros(n, n);
    for (r, &i) in rest.iter().enumerate() {
        for (c, &k) in rest.iter().enumerate() {
            m[(i, k)] = m_ii[(r, c)];
        }
        for (c, &j) in pivot.iter().enumerate() {
            m[(i, j)] = m_ij[(r, c)];
        }
    }
    for (r, &j) in pivot.iter().enumerate() {
        for (c, &k) in rest.iter().enumerate() {
            m[(j, k)] = m_ji[(r, c)];
        }
        for (c, &l) in pivot.iter().enumerate() {
            m[(j, l)] = a_jj_inv[(r, c)];
        }
    }
    Some(m)
}

fn pivot_or_singular(
    m: &DMatrix<f64>,
    pivot: &[usize],
    form: InputForm,
) -> StokesResult<DMatrix<f64>> {
    principal_pivot(m, pivot).ok_or_else(|| NumericalInstabilityError::SingularSystem { form }.into())
}

/// All reorderings as principal pivots on the fixed FTS slot layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct PivotReordering;

impl MatrixReordering for PivotReordering {
    // Stresslets become unknowns, strain rates become knowns.
    fn fts_to_fte(&self, layout: &DofLayout, m: DMatrix<f64>) -> StokesResult<DMatrix<f64>> {
        pivot_or_singular(&m, &layout.stresslet_slots(), InputForm::Fte)
    }

    // The leading spheres swap force for velocity.
    fn fte_to_ufte(
        &self,
        num_fixed_velocity_spheres: usize,
        layout: &DofLayout,
        m: DMatrix<f64>,
    ) -> StokesResult<DMatrix<f64>> {
        pivot_or_singular(
            &m,
            &layout.leading_sphere_force_slots(num_fixed_velocity_spheres),
            InputForm::Ufte,
        )
    }

    fn ufte_to_ufteu(
        &self,
        num_fixed_velocity_dumbbells: usize,
        _num_fixed_velocity_spheres: usize,
        layout: &DofLayout,
        m: DMatrix<f64>,
    ) -> StokesResult<DMatrix<f64>> {
        pivot_or_singular(
            &m,
            &layout.leading_dumbbell_slots(num_fixed_velocity_dumbbells),
            InputForm::Ufteu,
        )
    }

    fn fts_to_duf(
        &self,
        num_fixed_velocity_dumbbells: usize,
        layout: &DofLayout,
        m: DMatrix<f64>,
    ) -> StokesResult<DMatrix<f64>> {
        let mut pivot = layout.stresslet_slots();
        pivot.extend(layout.leading_dumbbell_slots(num_fixed_velocity_dumbbells));
        pivot_or_singular(&m, &pivot, InputForm::Duf)
    }
}
