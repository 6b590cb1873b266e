/// Unit-amplitude trapezoid: linear rise over `rise` samples, a plateau, then
/// a symmetric fall back to zero. The first and last samples are zero.
pub fn trapezoid(points: usize, rise: usize) -> Vec<f64> {
    if points < 2 {
        return vec![0.0; points];
    }
    let rise = rise.clamp(1, (points - 1) / 2 + 1);
    let last = points - 1;
    (0..points)
        .map(|i| {
            let edge = i.min(last - i);
            (edge as f64 / rise as f64).min(1.0)
        })
        .collect()
}

/// Adds `amplitude · shape` into `signal` starting at `start`, clipped to the signal.
pub fn superpose(signal: &mut [f64], start: usize, amplitude: f64, shape: &[f64]) {
    for (sample, value) in signal.iter_mut().skip(start).zip(shape) {
        *sample += amplitude * value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trapezoid_starts_and_ends_at_zero() {
        let shape = trapezoid(10, 3);
        assert_eq!(shape.len(), 10);
        assert_eq!(shape[0], 0.0);
        assert_eq!(shape[9], 0.0);
        assert!((shape[1] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(shape[4], 1.0);
    }

    #[test]
    fn superpose_clips_at_the_end() {
        let mut signal = vec![0.0; 5];
        superpose(&mut signal, 3, -2.0, &[1.0, 1.0, 1.0]);
        assert_eq!(signal, vec![0.0, 0.0, 0.0, -2.0, -2.0]);
    }
}
