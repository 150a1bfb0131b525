use nalgebra::{Matrix3, Point3, Vector3};

/// Periodic cell given by opposite corners. The cell may be sheared at run
/// time by the accumulated ambient flow, see `dynamics::boundary`.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct PeriodicBox {
    pub bottom_left: Point3<f64>,
    pub top_right: Point3<f64>,
}

impl PeriodicBox {
    pub fn l(&self) -> Vector3<f64> {
        self.top_right - self.bottom_left
    }

    pub fn centre(&self) -> Point3<f64> {
        nalgebra::center(&self.bottom_left, &self.top_right)
    }

    // Coincident corners mean "not periodic".
    pub fn is_degenerate(&self) -> bool {
        self.bottom_left == self.top_right
    }
}

/// Imposed linear flow: U∞ + O∞ × (x - centre) + E∞ · (x - centre).
// Matrices are read as 9 numbers in column-major order.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct AmbientFlowConfig {
    pub u_infinity: Vector3<f64>,
    pub o_infinity: Vector3<f64>,
    pub e_infinity: Matrix3<f64>,
    pub centre: Point3<f64>,
}

impl Default for AmbientFlowConfig {
    fn default() -> Self {
        AmbientFlowConfig {
            u_infinity: Vector3::zeros(),
            o_infinity: Vector3::zeros(),
            e_infinity: Matrix3::zeros(),
            centre: Point3::origin(),
        }
    }
}

/// Hookean spring joining the two beads of every dumbbell.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct SpringConfig {
    pub spring_constant: f64,
    pub natural_length: f64,
}
