pub struct InterpHelper;

impl InterpHelper {
    /// `count` evenly spaced points over `[start, stop]`, both ends included.
    pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
        match count {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (stop - start) / (count - 1) as f64;
                (0..count)
                    .map(|i| if i == count - 1 { stop } else { start + step * i as f64 })
                    .collect()
            }
        }
    }

    /// Piecewise-linear interpolation of `(xp, fp)` at `x`; clamps outside the range.
    /// `xp` must be increasing.
    pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
        let n = xp.len().min(fp.len());
        if n == 0 {
            return f64::NAN;
        }
        if x <= xp[0] {
            return fp[0];
        }
        if x >= xp[n - 1] {
            return fp[n - 1];
        }
        let upper = xp[..n].partition_point(|&v| v <= x);
        let lower = upper - 1;
        let span = xp[upper] - xp[lower];
        if span == 0.0 {
            return fp[lower];
        }
        fp[lower] + (fp[upper] - fp[lower]) * (x - xp[lower]) / span
    }

    /// Resamples `samples` onto `len * factor` points over the same index range.
    pub fn resample(samples: &[f64], factor: usize) -> Vec<f64> {
        if samples.is_empty() || factor == 0 {
            return samples.to_vec();
        }
        let index: Vec<f64> = (0..samples.len()).map(|i| i as f64).collect();
        Self::linspace(0.0, (samples.len() - 1) as f64, samples.len() * factor)
            .into_iter()
            .map(|x| Self::interp(x, &index, samples))
            .collect()
    }
}
