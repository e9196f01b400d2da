//! Held-out evaluation metrics

use authorcheck_core::{Error, Label, Result};

fn check_lengths(truth: &[Label], predicted: &[Label]) -> Result<()> {
    if truth.len() != predicted.len() {
        return Err(Error::training(format!(
            "{} true labels but {} predictions",
            truth.len(),
            predicted.len()
        )));
    }
    if truth.is_empty() {
        return Err(Error::training("cannot evaluate on an empty test set"));
    }
    Ok(())
}

/// Fraction of predictions equal to the truth
pub fn accuracy(truth: &[Label], predicted: &[Label]) -> Result<f64> {
    check_lengths(truth, predicted)?;
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / truth.len() as f64)
}

/// Per-class F1 averaged with weights equal to each class's true support.
///
/// A class with zero precision and recall contributes an F1 of 0.
pub fn weighted_f1(truth: &[Label], predicted: &[Label]) -> Result<f64> {
    check_lengths(truth, predicted)?;

    let mut weighted = 0.0;
    for class in Label::ALL {
        let support = truth.iter().filter(|&&t| t == class).count();
        if support == 0 {
            continue;
        }

        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (&t, &p) in truth.iter().zip(predicted) {
            match (t == class, p == class) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }

        let f1 = if tp == 0 {
            0.0
        } else {
            2.0 * tp as f64 / (2 * tp + fp + fn_) as f64
        };
        weighted += f1 * support as f64;
    }

    Ok(weighted / truth.len() as f64)
}
