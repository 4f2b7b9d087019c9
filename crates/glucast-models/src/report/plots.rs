use itertools_num::linspace;
use plotly::common::{DashType, Line, Mode};
use plotly::layout::{Axis, Layout};
use plotly::{Histogram, Plot, Scatter};

use crate::math::Array1;

/// Histogram of a single distribution, e.g. the training target.
pub fn plot_histogram(values: &Array1<f64>, name: &str, title: &str) -> Plot {
    let trace = Histogram::new(values.to_vec()).name(name);

    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title(name))
        .y_axis(Axis::new().title("Count"));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}

/// Sorted finite values and their empirical CDF heights.
fn ecdf(values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len() as f64;
    let heights = (1..=sorted.len()).map(|i| i as f64 / n).collect();
    (sorted, heights)
}

/// Step-function lookup of the ECDF at every point of `grid`.
fn interpolate_ecdf(x: &[f64], y: &[f64], grid: &[f64]) -> Vec<f64> {
    grid.iter()
        .map(|&g| {
            // number of samples <= g
            let count = x.partition_point(|&v| v <= g);
            if count == 0 {
                0.0
            } else {
                y[count - 1]
            }
        })
        .collect()
}

/// P-P plot comparing the ECDF of observed values with that of predictions.
///
/// Points on the diagonal mean the predicted distribution matches the
/// observed one. Returns `None` when either input has no finite values.
pub fn plot_pp(observed: &Array1<f64>, predicted: &Array1<f64>, title: &str) -> Option<Plot> {
    let (x_obs, y_obs) = ecdf(observed.as_slice());
    let (x_pred, y_pred) = ecdf(predicted.as_slice());

    let x_min = x_obs.first()?.min(*x_pred.first()?);
    let x_max = x_obs.last()?.max(*x_pred.last()?);
    let grid: Vec<f64> = linspace(x_min, x_max, 1000).collect();

    let obs_interp = interpolate_ecdf(&x_obs, &y_obs, &grid);
    let pred_interp = interpolate_ecdf(&x_pred, &y_pred, &grid);

    let scatter = Scatter::new(obs_interp, pred_interp)
        .mode(Mode::Markers)
        .name("Observed vs predicted ECDF");
    let reference_line = Scatter::new(vec![0.0, 1.0], vec![0.0, 1.0])
        .mode(Mode::Lines)
        .name("y = x")
        .line(Line::new().color("red").dash(DashType::Dash));

    let mut plot = Plot::new();
    plot.add_trace(scatter);
    plot.add_trace(reference_line);
    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("Observed ECDF"))
            .y_axis(Axis::new().title("Predicted ECDF")),
    );
    Some(plot)
}
