use nalgebra::{DMatrix, DVector, Vector3};

use crate::{
    config::setup::parameters::simulation::InputForm,
    error::{ConfigurationError, NumericalInstabilityError, StokesResult},
    geometry::tensor::condense,
    numerics::{
        interface::{InputBundle, MatrixReordering},
        layout::DofLayout,
    },
    state::ParticleLabel,
};

/// A boundary-condition mode with its partition sizes resolved against the
/// frame's inputs. Fixed-velocity particles occupy the leading indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryMode {
    Fts,
    Fte,
    Ufte {
        num_fixed_velocity_spheres: usize,
    },
    Ufteu {
        num_fixed_velocity_spheres: usize,
        num_fixed_velocity_dumbbells: usize,
    },
    Duf {
        num_fixed_velocity_dumbbells: usize,
    },
}

impl BoundaryMode {
    /// `None` for the closed-form drag mode, which has no linear system.
    pub fn resolve(form: InputForm, inputs: &InputBundle) -> StokesResult<Option<Self>> {
        let mode = match form {
            InputForm::Fts => BoundaryMode::Fts,
            InputForm::Fte => BoundaryMode::Fte,
            InputForm::Ufte => BoundaryMode::Ufte {
                num_fixed_velocity_spheres: fixed_sphere_count(form, inputs)?,
            },
            InputForm::Ufteu => BoundaryMode::Ufteu {
                num_fixed_velocity_spheres: fixed_sphere_count(form, inputs)?,
                num_fixed_velocity_dumbbells: fixed_dumbbell_count(form, inputs)?,
            },
            InputForm::Duf => BoundaryMode::Duf {
                num_fixed_velocity_dumbbells: fixed_dumbbell_count(form, inputs)?,
            },
            InputForm::StokesDragDumbbellsOnly => return Ok(None),
        };
        Ok(Some(mode))
    }

    pub fn form(&self) -> InputForm {
        match self {
            BoundaryMode::Fts => InputForm::Fts,
            BoundaryMode::Fte => InputForm::Fte,
            BoundaryMode::Ufte { .. } => InputForm::Ufte,
            BoundaryMode::Ufteu { .. } => InputForm::Ufteu,
            BoundaryMode::Duf { .. } => InputForm::Duf,
        }
    }

    pub fn num_fixed_velocity_spheres(&self) -> usize {
        match self {
            BoundaryMode::Ufte {
                num_fixed_velocity_spheres,
            }
            | BoundaryMode::Ufteu {
                num_fixed_velocity_spheres,
                ..
            } => *num_fixed_velocity_spheres,
            _ => 0,
        }
    }

    pub fn num_fixed_velocity_dumbbells(&self) -> usize {
        match self {
            BoundaryMode::Ufteu {
                num_fixed_velocity_dumbbells,
                ..
            }
            | BoundaryMode::Duf {
                num_fixed_velocity_dumbbells,
            } => *num_fixed_velocity_dumbbells,
            _ => 0,
        }
    }

    // Only fts solves for strain rates; every other mode solves for stresslets.
    pub fn stresslets_known(&self) -> bool {
        matches!(self, BoundaryMode::Fts)
    }

    // The fte-family supplier may need the reordered matrix (friction terms).
    pub fn inputs_need_matrix(&self) -> bool {
        matches!(self, BoundaryMode::Fte)
    }
}

fn leading_count<T>(
    items: &[T],
    fixed: impl Fn(&T) -> bool,
    form: InputForm,
    label: impl Fn(usize) -> ParticleLabel,
) -> Result<usize, ConfigurationError> {
    let n = items.iter().take_while(|x| fixed(x)).count();
    match items.iter().skip(n).position(|x| fixed(x)) {
        Some(i) => Err(ConfigurationError::InconsistentPartition {
            form,
            particle: label(n + i),
        }),
        None => Ok(n),
    }
}

fn fixed_sphere_count(form: InputForm, inputs: &InputBundle) -> Result<usize, ConfigurationError> {
    leading_count(
        &inputs.spheres,
        |s| s.velocity.is_some(),
        form,
        ParticleLabel::Sphere,
    )
}

fn fixed_dumbbell_count(
    form: InputForm,
    inputs: &InputBundle,
) -> Result<usize, ConfigurationError> {
    leading_count(
        &inputs.dumbbells,
        |d| d.velocity.is_some(),
        form,
        ParticleLabel::Dumbbell,
    )
}

pub(crate) fn require<T: Copy>(
    value: Option<T>,
    form: InputForm,
    particle: ParticleLabel,
    quantity: &'static str,
) -> Result<T, ConfigurationError> {
    value.ok_or(ConfigurationError::MissingInput {
        form,
        particle,
        quantity,
    })
}

/// Builds the excitation vector of knowns for `mode`, in `DofLayout` slot
/// order. Fails on the first unset input the mode needs.
pub fn pack_rhs(
    mode: &BoundaryMode,
    inputs: &InputBundle,
    layout: &DofLayout,
) -> Result<DVector<f64>, ConfigurationError> {
    let form = mode.form();
    let mut rhs = DVector::zeros(layout.size());

    for (i, s) in inputs.spheres.iter().enumerate() {
        let label = ParticleLabel::Sphere(i);
        let f_or_u = if i < mode.num_fixed_velocity_spheres() {
            require(s.velocity, form, label, "velocity")?
        } else {
            require(s.force, form, label, "force")?
        };
        let t = require(s.torque, form, label, "torque")?;
        let s_or_e = if mode.stresslets_known() {
            condense(&require(s.stresslet, form, label, "stresslet")?)
        } else {
            condense(&require(s.strain_rate, form, label, "strain rate")?)
        };
        rhs.fixed_rows_mut::<3>(layout.sphere_force(i))
            .copy_from(&f_or_u);
        rhs.fixed_rows_mut::<3>(layout.sphere_torque(i)).copy_from(&t);
        rhs.fixed_rows_mut::<5>(layout.sphere_stresslet(i))
            .copy_from(&s_or_e);
    }

    for (i, d) in inputs.dumbbells.iter().enumerate() {
        let label = ParticleLabel::Dumbbell(i);
        let (f_or_u, df_or_du): (Vector3<f64>, Vector3<f64>) =
            if i < mode.num_fixed_velocity_dumbbells() {
                (
                    require(d.velocity, form, label, "velocity")?,
                    require(
                        d.half_velocity_difference,
                        form,
                        label,
                        "half velocity difference",
                    )?,
                )
            } else {
                (
                    require(d.force, form, label, "force")?,
                    require(d.force_difference, form, label, "force difference")?,
                )
            };
        rhs.fixed_rows_mut::<3>(layout.dumbbell_force(i))
            .copy_from(&f_or_u);
        rhs.fixed_rows_mut::<3>(layout.dumbbell_force_difference(i))
            .copy_from(&df_or_du);
    }

    Ok(rhs)
}

/// Reorders the FTS grand resistance matrix so that its unknowns are the
/// quantities `mode` solves for.
pub fn reorder_matrix(
    mode: &BoundaryMode,
    layout: &DofLayout,
    grand_resistance_matrix: DMatrix<f64>,
    reordering: &dyn MatrixReordering,
) -> StokesResult<DMatrix<f64>> {
    match *mode {
        BoundaryMode::Fts => Ok(grand_resistance_matrix),
        BoundaryMode::Fte => reordering.fts_to_fte(layout, grand_resistance_matrix),
        BoundaryMode::Ufte {
            num_fixed_velocity_spheres,
        } => {
            let fte = reordering.fts_to_fte(layout, grand_resistance_matrix)?;
            reordering.fte_to_ufte(num_fixed_velocity_spheres, layout, fte)
        }
        BoundaryMode::Ufteu {
            num_fixed_velocity_spheres,
            num_fixed_velocity_dumbbells,
        } => {
            let fte = reordering.fts_to_fte(layout, grand_resistance_matrix)?;
            let ufte = reordering.fte_to_ufte(num_fixed_velocity_spheres, layout, fte)?;
            reordering.ufte_to_ufteu(
                num_fixed_velocity_dumbbells,
                num_fixed_velocity_spheres,
                layout,
                ufte,
            )
        }
        BoundaryMode::Duf {
            num_fixed_velocity_dumbbells,
        } => reordering.fts_to_duf(num_fixed_velocity_dumbbells, layout, grand_resistance_matrix),
    }
}

/// `matrix · unknowns = rhs` for one frame.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    pub mode: BoundaryMode,
    pub layout: DofLayout,
    pub matrix: DMatrix<f64>,
    pub rhs: DVector<f64>,
}

impl LinearSystem {
    pub fn solve(&self) -> StokesResult<DVector<f64>> {
        self.matrix
            .clone()
            .lu()
            .solve(&self.rhs)
            .ok_or_else(|| self.singular().into())
    }

    /// Explicit inverse, for when a sub-block of the mobility is wanted as
    /// well as the solution.
    pub fn mobility(&self) -> StokesResult<DMatrix<f64>> {
        self.matrix
            .clone()
            .try_inverse()
            .ok_or_else(|| self.singular().into())
    }

    fn singular(&self) -> NumericalInstabilityError {
        NumericalInstabilityError::SingularSystem {
            form: self.mode.form(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::{
        interface::{AmbientFlow, DumbbellInputs, SphereInputs},
        reorder::PivotReordering,
    };
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn free_sphere() -> SphereInputs {
        SphereInputs {
            force: Some(Vector3::new(1.0, 2.0, 3.0)),
            torque: Some(Vector3::new(4.0, 5.0, 6.0)),
            stresslet: Some(Matrix3::zeros()),
            strain_rate: Some(Matrix3::new(0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0)),
            ..Default::default()
        }
    }

    fn fixed_sphere() -> SphereInputs {
        SphereInputs {
            force: None,
            velocity: Some(Vector3::new(-1.0, 0.0, 0.0)),
            ..free_sphere()
        }
    }

    fn bundle(spheres: Vec<SphereInputs>, dumbbells: Vec<DumbbellInputs>) -> InputBundle {
        InputBundle {
            spheres,
            dumbbells,
            ambient: AmbientFlow::quiescent(),
            periodic_box: None,
            viscosity: 1.0,
            description: "test".to_string(),
        }
    }

    #[test]
    fn test_resolve_partition_counts() {
        let inputs = bundle(
            vec![fixed_sphere(), fixed_sphere(), free_sphere()],
            vec![DumbbellInputs {
                velocity: Some(Vector3::zeros()),
                half_velocity_difference: Some(Vector3::zeros()),
                ..Default::default()
            }],
        );
        assert_eq!(
            BoundaryMode::resolve(InputForm::Ufteu, &inputs).unwrap(),
            Some(BoundaryMode::Ufteu {
                num_fixed_velocity_spheres: 2,
                num_fixed_velocity_dumbbells: 1,
            })
        );
        assert_eq!(
            BoundaryMode::resolve(InputForm::StokesDragDumbbellsOnly, &inputs).unwrap(),
            None
        );
    }

    #[test]
    fn test_resolve_rejects_interleaved_partition() {
        let inputs = bundle(vec![fixed_sphere(), free_sphere(), fixed_sphere()], vec![]);
        let err = BoundaryMode::resolve(InputForm::Ufte, &inputs).unwrap_err();
        assert!(format!("{err}").contains("sphere 2"));
    }

    #[test]
    fn test_fts_requires_stresslets() {
        let mut sphere = free_sphere();
        sphere.stresslet = None;
        let inputs = bundle(vec![free_sphere(), sphere], vec![]);
        let err = pack_rhs(&BoundaryMode::Fts, &inputs, &DofLayout::new(2, 0)).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingInput {
                particle: ParticleLabel::Sphere(1),
                quantity: "stresslet",
                ..
            }
        ));
        // fte needs strain rates instead.
        assert!(pack_rhs(&BoundaryMode::Fte, &inputs, &DofLayout::new(2, 0)).is_ok());
    }

    #[test]
    fn test_ufte_requires_force_on_free_spheres() {
        let mut sphere = free_sphere();
        sphere.force = None;
        let inputs = bundle(vec![fixed_sphere(), sphere], vec![]);
        let mode = BoundaryMode::resolve(InputForm::Ufte, &inputs).unwrap().unwrap();
        let err = pack_rhs(&mode, &inputs, &DofLayout::new(2, 0)).unwrap_err();
        assert!(format!("{err}").contains("no force has been provided for sphere 1"));
    }

    #[test]
    fn test_ufte_packs_velocity_in_force_slot() {
        let inputs = bundle(vec![fixed_sphere(), free_sphere()], vec![]);
        let layout = DofLayout::new(2, 0);
        let mode = BoundaryMode::Ufte {
            num_fixed_velocity_spheres: 1,
        };
        let rhs = pack_rhs(&mode, &inputs, &layout).unwrap();
        assert_relative_eq!(rhs[0], -1.0);
        assert_relative_eq!(rhs[3], 1.0);
        assert_relative_eq!(rhs[layout.sphere_torque(1) + 2], 6.0);
        // Strain rate xz component.
        assert_relative_eq!(rhs[layout.sphere_stresslet(0) + 2], 0.5);
    }

    #[test]
    fn test_fts_solve_has_zero_residual() {
        let layout = DofLayout::new(1, 1);
        let n = layout.size();
        let matrix = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                3.0 + (i % 4) as f64
            } else {
                0.1 * ((i * 7 + j * 3) % 5) as f64 - 0.2
            }
        });
        let inputs = bundle(
            vec![free_sphere()],
            vec![DumbbellInputs {
                force: Some(Vector3::new(0.0, 0.0, -1.0)),
                force_difference: Some(Vector3::new(0.5, 0.0, 0.0)),
                ..Default::default()
            }],
        );
        let mode = BoundaryMode::Fts;
        let system = LinearSystem {
            mode,
            layout,
            matrix: reorder_matrix(&mode, &layout, matrix.clone(), &PivotReordering).unwrap(),
            rhs: pack_rhs(&mode, &inputs, &layout).unwrap(),
        };
        let velocity = system.solve().unwrap();
        assert_relative_eq!((&matrix * &velocity - &system.rhs).norm(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_singular_system() {
        let system = LinearSystem {
            mode: BoundaryMode::Fte,
            layout: DofLayout::new(1, 0),
            matrix: DMatrix::zeros(11, 11),
            rhs: DVector::zeros(11),
        };
        assert!(system.solve().is_err());
        assert!(system.mobility().is_err());
    }
}
