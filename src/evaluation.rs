// Windowed samples + anomaly masks, the hand-off format for the external
// discriminative/predictive/diversity scorers. No scoring happens here.

use ndarray::{s, Array1, Array2};
use std::path::Path;
use tracing::info;

use crate::error::{InjectError, Result};

/// One lagged window per timestep: row `i` holds `values[i-size+1..=i]`,
/// zero-padded before the series start.
pub fn sliding_windows(values: &Array1<f64>, size: usize) -> Array2<f64> {
    let n = values.len();
    let mut out = Array2::<f64>::zeros((n, size));
    for i in 0..n {
        for j in 0..size {
            // column size-1 is the current step
            let lag = size - 1 - j;
            if i >= lag {
                out[(i, j)] = values[i - lag];
            }
        }
    }
    out
}

/// True where the window ending at `i` touches any anomalous step.
pub fn window_mask(labels: &Array1<f64>, size: usize) -> Vec<bool> {
    sliding_windows(labels, size)
        .rows()
        .into_iter()
        .map(|row| row.iter().any(|&l| l != 0.0))
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct EvalSamples {
    pub windows: Array2<f64>,
    pub mask: Vec<bool>,
}

impl EvalSamples {
    /// Windows and mask with `size` rows trimmed from both ends.
    pub fn from_columns(values: &Array1<f64>, labels: &Array1<f64>, size: usize) -> Result<Self> {
        let n = values.len();
        if labels.len() != n {
            return Err(InjectError::invalid_series(format!(
                "label length {} does not match value length {n}",
                labels.len()
            )));
        }
        if size == 0 || n <= 2 * size {
            return Err(InjectError::invalid_series(format!(
                "series of length {n} is too short for windows of size {size}"
            )));
        }

        let windows = sliding_windows(values, size).slice(s![size..n - size, ..]).to_owned();
        let mask = window_mask(labels, size)[size..n - size].to_vec();
        Ok(Self { windows, mask })
    }

    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    pub fn anomalous(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
}

/// CSV with one row per sample: `source, anomalous, v0..v{size-1}`.
pub fn write_eval_samples(path: &Path, real: &EvalSamples, synthetic: &EvalSamples) -> Result<()> {
    let size = real.windows.ncols();
    if synthetic.windows.ncols() != size {
        return Err(InjectError::configuration("real and synthetic window sizes differ"));
    }

    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["source".to_string(), "anomalous".to_string()];
    header.extend((0..size).map(|j| format!("v{j}")));
    writer.write_record(&header)?;

    for (source, samples) in [("real", real), ("synthetic", synthetic)] {
        for (row, &m) in samples.windows.rows().into_iter().zip(&samples.mask) {
            let mut rec = vec![source.to_string(), u8::from(m).to_string()];
            rec.extend(row.iter().map(|v| v.to_string()));
            writer.write_record(&rec)?;
        }
    }
    writer.flush()?;
    info!(
        path = %path.display(),
        real = real.len(),
        synthetic = synthetic.len(),
        "wrote evaluation samples"
    );
    Ok(())
}
