use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Row indices for the train and held-out sets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    pub stratified: bool,
}

/// Whether a key is usable for stratification: at least 5 distinct values,
/// each occurring at least twice.
pub fn can_stratify(keys: &[i32]) -> bool {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for k in keys {
        *counts.entry(*k).or_default() += 1;
    }
    counts.len() >= 5 && counts.values().all(|&c| c >= 2)
}

/// Shuffle-split `n` rows. When `strata` is given and usable, each stratum
/// contributes its own share to the held-out set; otherwise the split is
/// plain random.
pub fn train_test_split(n: usize, strata: Option<&[i32]>, test_fraction: f64, seed: u64) -> Split {
    let mut rng = StdRng::seed_from_u64(seed);
    let test_fraction = test_fraction.clamp(0.0, 1.0);

    match strata.filter(|s| s.len() == n && can_stratify(s)) {
        Some(keys) => {
            let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
            for (i, k) in keys.iter().enumerate() {
                groups.entry(*k).or_default().push(i);
            }

            let mut train = Vec::with_capacity(n);
            let mut test = Vec::new();
            for (_, mut members) in groups {
                members.shuffle(&mut rng);
                let k = test_count(members.len(), test_fraction);
                test.extend_from_slice(&members[..k]);
                train.extend_from_slice(&members[k..]);
            }
            train.shuffle(&mut rng);
            test.shuffle(&mut rng);
            Split {
                train,
                test,
                stratified: true,
            }
        }
        None => {
            let mut indices: Vec<usize> = (0..n).collect();
            indices.shuffle(&mut rng);
            let k = test_count(n, test_fraction);
            let train = indices.split_off(k);
            Split {
                train,
                test: indices,
                stratified: false,
            }
        }
    }
}

/// Held-out size for a group: rounded share, but never the whole group and
/// at least one row once there are two.
fn test_count(len: usize, fraction: f64) -> usize {
    if len < 2 {
        return 0;
    }
    let k = (len as f64 * fraction).round() as usize;
    k.clamp(1, len - 1)
}
