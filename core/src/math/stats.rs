pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f64).sqrt()
    }

    pub fn mean(samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    /// Mean spacing of consecutive samples, i.e. `mean(diff(samples))`.
    pub fn mean_step(samples: &[f64]) -> Option<f64> {
        if samples.len() < 2 {
            return None;
        }
        let steps: Vec<f64> = samples.windows(2).map(|w| w[1] - w[0]).collect();
        Self::mean(&steps)
    }

    /// Index and value of the global minimum (`min == true`) or maximum.
    /// Ties resolve to the first occurrence.
    pub fn extremum(samples: &[f64], min: bool) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (index, &value) in samples.iter().enumerate() {
            let better = match best {
                None => true,
                Some((_, current)) if min => value < current,
                Some((_, current)) => value > current,
            };
            if better {
                best = Some((index, value));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_zero_sequence_yields_zero() {
        assert_eq!(StatsHelper::rms(&[]), 0.0);
        assert_eq!(StatsHelper::rms(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn rms_handles_single_value() {
        assert_eq!(StatsHelper::rms(&[4.0]), 4.0);
    }

    #[test]
    fn mean_step_of_uniform_axis() {
        let axis = [0.0, 0.1, 0.2, 0.3];
        assert!((StatsHelper::mean_step(&axis).unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(StatsHelper::mean_step(&[1.0]), None);
    }

    #[test]
    fn extremum_prefers_first_occurrence() {
        let samples = [0.0, -2.0, 1.0, -2.0, 1.0];
        assert_eq!(StatsHelper::extremum(&samples, true), Some((1, -2.0)));
        assert_eq!(StatsHelper::extremum(&samples, false), Some((2, 1.0)));
        assert_eq!(StatsHelper::extremum(&[], true), None);
    }
}
