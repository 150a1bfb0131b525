use std::{fs::File, io, path::Path};

use crate::{error::StokesResult, state::SimState};

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct CheckpointRow {
    pub step: usize,
    pub t: f64,
    pub kind: String,
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    // Δx for dumbbells, first rotation marker offset for spheres.
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

pub fn checkpoint_rows(sim_state: &SimState) -> Vec<CheckpointRow> {
    let row = |kind: &str, index, r: nalgebra::Point3<f64>, d: nalgebra::Vector3<f64>| {
        CheckpointRow {
            step: sim_state.step,
            t: sim_state.t,
            kind: kind.to_string(),
            index,
            x: r.x,
            y: r.y,
            z: r.z,
            dx: d.x,
            dy: d.y,
            dz: d.z,
        }
    };
    let spheres = sim_state
        .spheres
        .iter()
        .enumerate()
        .map(|(i, s)| row("sphere", i, s.position, s.rotation_markers[0] - s.position));
    let dumbbells = sim_state
        .dumbbells
        .iter()
        .enumerate()
        .map(|(i, d)| row("dumbbell", i, d.position, d.delta_x));
    spheres.chain(dumbbells).collect()
}

/// One row per particle per checkpoint.
pub struct CheckpointWriter<W: io::Write> {
    writer: csv::Writer<W>,
}

impl CheckpointWriter<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> StokesResult<Self> {
        Ok(CheckpointWriter {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl<W: io::Write> CheckpointWriter<W> {
    pub fn from_writer(writer: W) -> Self {
        CheckpointWriter {
            writer: csv::Writer::from_writer(writer),
        }
    }

    pub fn write_checkpoint(&mut self, sim_state: &SimState) -> StokesResult<()> {
        for row in checkpoint_rows(sim_state) {
            self.writer.serialize(row)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> StokesResult<()> {
        self.writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn into_inner(self) -> StokesResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Dumbbell, Sphere};
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_checkpoint_rows() {
        let mut state = SimState::new(
            vec![Sphere::new(Point3::new(1.0, 2.0, 3.0), 0.5)],
            vec![Dumbbell::new(Point3::origin(), Vector3::new(0.0, 0.0, 2.0), 0.1)],
        );
        state.step = 4;
        state.t = 0.4;
        let mut writer = CheckpointWriter::from_writer(Vec::new());
        writer.write_checkpoint(&state).unwrap();
        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "step,t,kind,index,x,y,z,dx,dy,dz");
        assert_eq!(lines[1], "4,0.4,sphere,0,1.0,2.0,3.0,0.5,0.0,0.0");
        assert_eq!(lines[2], "4,0.4,dumbbell,0,0.0,0.0,0.0,0.0,0.0,2.0");
    }
}
