use thiserror::Error;

/// Highest charge assignment order with tabulated closed forms.
pub const MAX_ORDER: usize = 7;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum InterpolationError {
    #[error("Unsupported charge assignment order {0} (expected 1..={MAX_ORDER})")]
    UnsupportedOrder(usize),
    #[error("Interpolation table needs at least one bin per half mesh spacing")]
    EmptyTable,
}

/// Provider of the separable charge-assignment kernel and its derivative.
///
/// Implementations are tabulated over `2 * max_interpol` bins covering the
/// fractional offset `[-0.5, 0.5)` of a particle from its nearest mesh point.
/// `weight(i, arg)` is the weight of stencil point `i ∈ [0, order)` for bin
/// `arg`, `derivative_weight(i, arg)` its derivative with respect to the
/// offset in mesh units.
pub trait InterpolationWeights: Send + Sync {
    fn order(&self) -> usize;
    fn max_interpol(&self) -> usize;
    fn weight(&self, i: usize, arg: usize) -> f64;
    fn derivative_weight(&self, i: usize, arg: usize) -> f64;

    /// Number of table bins, `2 * max_interpol`.
    fn bins(&self) -> usize {
        2 * self.max_interpol()
    }
}

/// Cardinal B-spline `M_n` with support `[0, n)`.
pub fn cardinal_bspline(n: usize, u: f64) -> f64 {
    match n {
        0 => 0.0,
        1 => {
            if (0.0..1.0).contains(&u) {
                1.0
            } else {
                0.0
            }
        }
        _ => {
            let nf = n as f64;
            (u * cardinal_bspline(n - 1, u) + (nf - u) * cardinal_bspline(n - 1, u - 1.0))
                / (nf - 1.0)
        }
    }
}

/// Tabulated B-spline assignment weights, the standard P3M kernel.
///
/// Bin `a` is evaluated at its centre, `x = (a + 0.5) / (2 * max_interpol) - 0.5`.
#[derive(Debug, Clone)]
pub struct BSplineTable {
    order: usize,
    max_interpol: usize,
    weights: Vec<f64>,
    derivatives: Vec<f64>,
}

impl BSplineTable {
    pub fn new(order: usize, max_interpol: usize) -> Result<Self, InterpolationError> {
        if order == 0 || order > MAX_ORDER {
            return Err(InterpolationError::UnsupportedOrder(order));
        }
        if max_interpol == 0 {
            return Err(InterpolationError::EmptyTable);
        }

        let bins = 2 * max_interpol;
        let n = order as f64;
        let mut weights = Vec::with_capacity(order * bins);
        let mut derivatives = Vec::with_capacity(order * bins);

        for i in 0..order {
            for arg in 0..bins {
                let x = (arg as f64 + 0.5) / bins as f64 - 0.5;
                let u = x + n - 0.5 - i as f64;
                weights.push(cardinal_bspline(order, u));
                derivatives.push(if order == 1 {
                    0.0
                } else {
                    cardinal_bspline(order - 1, u) - cardinal_bspline(order - 1, u - 1.0)
                });
            }
        }

        Ok(Self {
            order,
            max_interpol,
            weights,
            derivatives,
        })
    }
}

impl InterpolationWeights for BSplineTable {
    #[inline]
    fn order(&self) -> usize {
        self.order
    }

    #[inline]
    fn max_interpol(&self) -> usize {
        self.max_interpol
    }

    #[inline]
    fn weight(&self, i: usize, arg: usize) -> f64 {
        self.weights[i * 2 * self.max_interpol + arg]
    }

    #[inline]
    fn derivative_weight(&self, i: usize, arg: usize) -> f64 {
        self.derivatives[i * 2 * self.max_interpol + arg]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn rejects_unsupported_orders_and_empty_tables() {
        assert_eq!(
            BSplineTable::new(0, 10).unwrap_err(),
            InterpolationError::UnsupportedOrder(0)
        );
        assert_eq!(
            BSplineTable::new(8, 10).unwrap_err(),
            InterpolationError::UnsupportedOrder(8)
        );
        assert_eq!(
            BSplineTable::new(3, 0).unwrap_err(),
            InterpolationError::EmptyTable
        );
    }

    #[test]
    fn weights_form_a_partition_of_unity() {
        for order in 1..=MAX_ORDER {
            let table = BSplineTable::new(order, 50).unwrap();
            for arg in 0..table.bins() {
                let sum: f64 = (0..order).map(|i| table.weight(i, arg)).sum();
                assert!((sum - 1.0).abs() < TOLERANCE, "order {order}, bin {arg}: {sum}");
            }
        }
    }

    #[test]
    fn derivative_weights_sum_to_zero() {
        for order in 1..=MAX_ORDER {
            let table = BSplineTable::new(order, 50).unwrap();
            for arg in 0..table.bins() {
                let sum: f64 = (0..order).map(|i| table.derivative_weight(i, arg)).sum();
                assert!(sum.abs() < TOLERANCE, "order {order}, bin {arg}: {sum}");
            }
        }
    }

    #[test]
    fn weights_are_mirror_symmetric() {
        for order in 1..=MAX_ORDER {
            let table = BSplineTable::new(order, 20).unwrap();
            let bins = table.bins();
            for i in 0..order {
                for arg in 0..bins {
                    let w = table.weight(i, arg);
                    let mirrored = table.weight(order - 1 - i, bins - 1 - arg);
                    assert!((w - mirrored).abs() < TOLERANCE);
                }
            }
        }
    }

    #[test]
    fn first_order_is_nearest_grid_point() {
        let table = BSplineTable::new(1, 4).unwrap();
        for arg in 0..table.bins() {
            assert_eq!(table.weight(0, arg), 1.0);
            assert_eq!(table.derivative_weight(0, arg), 0.0);
        }
    }

    #[test]
    fn second_order_is_linear_cloud_in_cell() {
        let table = BSplineTable::new(2, 2).unwrap();
        // Bin centres at x = -0.375, -0.125, 0.125, 0.375.
        let expected_first = [0.875, 0.625, 0.375, 0.125];
        for (arg, &w) in expected_first.iter().enumerate() {
            assert!((table.weight(0, arg) - w).abs() < TOLERANCE);
            assert!((table.weight(1, arg) - (1.0 - w)).abs() < TOLERANCE);
            assert!((table.derivative_weight(0, arg) + 1.0).abs() < TOLERANCE);
            assert!((table.derivative_weight(1, arg) - 1.0).abs() < TOLERANCE);
        }
    }

    #[test]
    fn derivative_matches_finite_difference_of_weights() {
        let order = 5;
        let max_interpol = 500;
        let table = BSplineTable::new(order, max_interpol).unwrap();
        let dx = 1.0 / table.bins() as f64;
        for i in 0..order {
            for arg in 1..table.bins() - 1 {
                let fd = (table.weight(i, arg + 1) - table.weight(i, arg - 1)) / (2.0 * dx);
                assert!((fd - table.derivative_weight(i, arg)).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn cardinal_bspline_vanishes_outside_support() {
        for n in 1..=MAX_ORDER {
            assert_eq!(cardinal_bspline(n, -0.1), 0.0);
            assert_eq!(cardinal_bspline(n, n as f64 + 0.1), 0.0);
        }
    }
}
