use ndarray::{Array1, ArrayView1};

pub struct IntegrateHelper;

impl IntegrateHelper {
    /// Cumulative trapezoidal integral of `y` over `x`, starting at 0.
    /// The output has the same length as the input.
    pub fn cumulative_trapezoid(y: ArrayView1<f64>, x: ArrayView1<f64>) -> Array1<f64> {
        let n = y.len().min(x.len());
        let mut out = Array1::zeros(y.len());
        let mut running = 0.0;
        for i in 1..n {
            running += 0.5 * (y[i] + y[i - 1]) * (x[i] - x[i - 1]);
            out[i] = running;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn integrates_a_line_exactly() {
        let x = array![0.0, 1.0, 2.0, 3.0];
        let y = array![0.0, 2.0, 4.0, 6.0];
        let area = IntegrateHelper::cumulative_trapezoid(y.view(), x.view());
        assert_eq!(area, array![0.0, 1.0, 4.0, 9.0]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let empty = Array1::<f64>::zeros(0);
        assert!(IntegrateHelper::cumulative_trapezoid(empty.view(), empty.view()).is_empty());
    }
}
