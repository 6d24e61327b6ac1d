use crate::pricing::forest::PriceForest;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Coefficient of determination. 0 when the targets have no variance.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Increase in held-out MAE when one feature column is shuffled, per column.
///
/// Returns `(column index, importance)` sorted most important first.
pub fn permutation_importance(
    forest: &PriceForest,
    x: &[Vec<f64>],
    y: &[f64],
    seed: u64,
) -> Result<Vec<(usize, f64)>, String> {
    let baseline = mean_absolute_error(y, &forest.predict(x)?);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scores = Vec::with_capacity(forest.n_features());

    for col in 0..forest.n_features() {
        let mut column: Vec<f64> = x.iter().map(|r| r[col]).collect();
        column.shuffle(&mut rng);
        let permuted: Vec<Vec<f64>> = x
            .iter()
            .zip(&column)
            .map(|(row, v)| {
                let mut row = row.clone();
                row[col] = *v;
                row
            })
            .collect();
        let mae = mean_absolute_error(y, &forest.predict(&permuted)?);
        scores.push((col, mae - baseline));
    }

    scores.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    Ok(scores)
}
