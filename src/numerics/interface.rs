use nalgebra::{DMatrix, Matrix3, Point3, Vector3};

use crate::{
    config::setup::parameters::{
        common::{AmbientFlowConfig, PeriodicBox},
        simulation::InputForm,
    },
    error::StokesResult,
    state::{FrameVelocities, SimState},
};

use super::layout::DofLayout;

/// Ambient flow at one instant, including the rotation and strain
/// accumulated since t = 0 (`ot_infinity`, `et_infinity`) which shear the
/// periodic box.
#[derive(Debug, Clone, PartialEq)]
pub struct AmbientFlow {
    pub u_infinity: Vector3<f64>,
    pub o_infinity: Vector3<f64>,
    pub e_infinity: Matrix3<f64>,
    pub centre: Point3<f64>,
    pub ot_infinity: Vector3<f64>,
    pub et_infinity: Matrix3<f64>,
}

impl AmbientFlow {
    pub fn quiescent() -> Self {
        Self::at_time(&AmbientFlowConfig::default(), 0.0)
    }

    // Steady flow, so the accumulated tensors grow linearly in time.
    pub fn at_time(config: &AmbientFlowConfig, t: f64) -> Self {
        AmbientFlow {
            u_infinity: config.u_infinity,
            o_infinity: config.o_infinity,
            e_infinity: config.e_infinity,
            centre: config.centre,
            ot_infinity: config.o_infinity.scale(t),
            et_infinity: config.e_infinity.scale(t),
        }
    }
}

// `None` means the degree of freedom is not prescribed.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SphereInputs {
    pub force: Option<Vector3<f64>>,
    pub torque: Option<Vector3<f64>>,
    pub stresslet: Option<Matrix3<f64>>,
    pub velocity: Option<Vector3<f64>>,
    pub angular_velocity: Option<Vector3<f64>>,
    pub strain_rate: Option<Matrix3<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DumbbellInputs {
    pub force: Option<Vector3<f64>>,
    pub force_difference: Option<Vector3<f64>>,
    pub velocity: Option<Vector3<f64>>,
    pub half_velocity_difference: Option<Vector3<f64>>,
}

/// Everything the boundary-condition supplier prescribes for one frame.
#[derive(Debug, Clone)]
pub struct InputBundle {
    pub spheres: Vec<SphereInputs>,
    pub dumbbells: Vec<DumbbellInputs>,
    pub ambient: AmbientFlow,
    pub periodic_box: Option<PeriodicBox>,
    pub viscosity: f64,
    pub description: String,
}

impl InputBundle {
    // A box with coincident corners is treated as no box at all.
    pub fn effective_box(&self) -> Option<&PeriodicBox> {
        self.periodic_box.as_ref().filter(|b| !b.is_degenerate())
    }
}

pub struct SupplyRequest<'a> {
    pub input_form: InputForm,
    pub state: &'a SimState,
    pub frame: usize,
    pub dt: f64,
    pub previous_velocities: Option<&'a FrameVelocities>,
    // Only present on the second, full call in fte mode.
    pub resistance_fte: Option<&'a DMatrix<f64>>,
    // Cheap call: only geometry and ambient flow need to be right.
    pub skip_computation: bool,
}

pub trait BoundaryConditionSupplier {
    fn supply(&self, request: &SupplyRequest<'_>) -> StokesResult<InputBundle>;
}

/// Retained far-field mobility inverse. Threaded explicitly from frame to
/// frame.
#[derive(Debug, Clone, Default)]
pub struct FarFieldCache {
    minfinity_inverse: Option<DMatrix<f64>>,
    generated_at_frame: Option<usize>,
}

impl FarFieldCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(minfinity_inverse: DMatrix<f64>, frame: usize) -> Self {
        FarFieldCache {
            minfinity_inverse: Some(minfinity_inverse),
            generated_at_frame: Some(frame),
        }
    }

    pub fn minfinity_inverse(&self) -> Option<&DMatrix<f64>> {
        self.minfinity_inverse.as_ref()
    }

    pub fn generated_at_frame(&self) -> Option<usize> {
        self.generated_at_frame
    }

    /// Whether the cached inverse may be reused on `frame`.
    pub fn is_valid(&self, frame: usize, invert_m_every: usize, layout: &DofLayout) -> bool {
        match (&self.minfinity_inverse, self.generated_at_frame) {
            (Some(m), Some(generated)) => {
                m.nrows() == layout.size()
                    && generated <= frame
                    && frame % invert_m_every.max(1) != 0
            }
            _ => false,
        }
    }
}

pub struct PeriodicGeometry<'a> {
    pub periodic_box: &'a PeriodicBox,
    pub ambient: &'a AmbientFlow,
    pub dt: f64,
}

pub struct MatrixRequest<'a> {
    pub frame: usize,
    pub viscosity: f64,
    pub regenerate: bool,
    pub periodic: Option<PeriodicGeometry<'a>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationTimings {
    pub far_field: f64,
    pub near_field: f64,
}

pub struct GeneratedMatrix {
    // FTS ordering, see `DofLayout`.
    pub matrix: DMatrix<f64>,
    pub layout: DofLayout,
    pub cache: FarFieldCache,
    pub timings: GenerationTimings,
}

pub trait ResistanceMatrixGenerator {
    fn generate(
        &self,
        state: &SimState,
        cache: &FarFieldCache,
        request: &MatrixRequest<'_>,
    ) -> StokesResult<GeneratedMatrix>;
}

/// Re-indexing of the grand resistance matrix between boundary-condition
/// modes. Each transform takes `knowns = M · unknowns` in one ordering and
/// returns the matrix for the other.
pub trait MatrixReordering {
    fn fts_to_fte(&self, layout: &DofLayout, m: DMatrix<f64>) -> StokesResult<DMatrix<f64>>;

    fn fte_to_ufte(
        &self,
        num_fixed_velocity_spheres: usize,
        layout: &DofLayout,
        m: DMatrix<f64>,
    ) -> StokesResult<DMatrix<f64>>;

    fn ufte_to_ufteu(
        &self,
        num_fixed_velocity_dumbbells: usize,
        num_fixed_velocity_spheres: usize,
        layout: &DofLayout,
        m: DMatrix<f64>,
    ) -> StokesResult<DMatrix<f64>>;

    fn fts_to_duf(
        &self,
        num_fixed_velocity_dumbbells: usize,
        layout: &DofLayout,
        m: DMatrix<f64>,
    ) -> StokesResult<DMatrix<f64>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cache_validity() {
        let layout = DofLayout::new(1, 0);
        let empty = FarFieldCache::new();
        assert!(!empty.is_valid(3, 5, &layout));

        let cache = FarFieldCache::store(DMatrix::identity(11, 11), 0);
        assert!(cache.is_valid(3, 5, &layout));
        // Regeneration frame.
        assert!(!cache.is_valid(5, 5, &layout));
        // Wrong size.
        assert!(!cache.is_valid(3, 5, &DofLayout::new(2, 0)));
    }

    #[test]
    fn test_ambient_accumulates() {
        let config = AmbientFlowConfig {
            o_infinity: Vector3::new(0.0, 0.5, 0.0),
            ..Default::default()
        };
        let ambient = AmbientFlow::at_time(&config, 4.0);
        assert_relative_eq!(ambient.ot_infinity, Vector3::new(0.0, 2.0, 0.0));
        assert_relative_eq!(ambient.et_infinity, Matrix3::zeros());
    }
}
