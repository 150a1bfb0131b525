use nalgebra::{UnitVector3, Vector3};
use rand::distributions::Distribution;
use rand_distr::StandardNormal;

pub fn random_vector<R: rand::Rng, T: Distribution<f64>>(rng: &mut R, distr: T) -> Vector3<f64> {
    Vector3::new(distr.sample(rng), distr.sample(rng), distr.sample(rng))
}

// Isotropic, since the standard normal is spherically symmetric.
pub fn random_unit_vector<R: rand::Rng>(rng: &mut R) -> UnitVector3<f64> {
    nalgebra::Unit::new_normalize(random_vector(rng, StandardNormal))
}
