use nalgebra::{Matrix3, Vector5};

// Symmetric traceless tensors (stresslets, strain rates) travel through the
// linear system as five components [xx, xy, xz, yz, yy], with zz = -xx - yy.

pub fn condense(m: &Matrix3<f64>) -> Vector5<f64> {
    Vector5::new(m[(0, 0)], m[(0, 1)], m[(0, 2)], m[(1, 2)], m[(1, 1)])
}

pub fn expand(v: &Vector5<f64>) -> Matrix3<f64> {
    Matrix3::new(
        v[0],
        v[1],
        v[2],
        v[1],
        v[4],
        v[3],
        v[2],
        v[3],
        -v[0] - v[4],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_expand_condensed_shear() {
        // Simple shear strain rate in the xz plane.
        let e = Matrix3::new(0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0);
        let v = condense(&e);
        assert_relative_eq!(v, Vector5::new(0.0, 0.0, 0.5, 0.0, 0.0));
        assert_relative_eq!(expand(&v), e);
    }

    #[test]
    fn test_expand_is_traceless() {
        let m = expand(&Vector5::new(1.0, 2.0, 3.0, 4.0, 5.0));
        assert_relative_eq!(m.trace(), 0.0);
        assert_relative_eq!(m, m.transpose());
    }
}
