use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Chi-square goodness-of-fit test of a sampler of categories `0..probabilities.len()`.
///
/// Adjacent categories are pooled until their expected count reaches five.
pub fn assert_goodness_of_fit(
    n_samples: usize,
    probabilities: &[f64],
    mut sample: impl FnMut() -> usize,
    alpha: f64,
) -> Option<String> {
    let ns = n_samples as f64;
    let mut counts = vec![0_usize; probabilities.len()];
    for _ in 0..n_samples {
        counts[sample()] += 1;
    }
    let threshold = 5.0;
    let mut chisq = 0.0;
    let mut df = 0;
    let mut observed = 0;
    let mut expected = 0.0;
    for (count, probability) in counts.iter().zip(probabilities.iter()) {
        observed += count;
        expected += ns * probability;
        if expected >= threshold {
            let o = observed as f64;
            chisq += (o - expected) * (o - expected) / expected;
            df += 1;
            observed = 0;
            expected = 0.0;
        }
    }
    if expected > 0.0 {
        let o = observed as f64;
        chisq += (o - expected) * (o - expected) / expected;
        df += 1;
    } else if observed > 0 {
        return Some(format!(
            "Sampled {} items from categories with negligible probability.",
            observed
        ));
    }
    let distr = ChiSquared::new((df - 1) as f64).unwrap();
    let p_value = 1.0 - distr.cdf(chisq);
    if p_value <= alpha {
        Some(format!(
            "Rejected goodness of fit test... p-value: {:.8}, chisq: {:.2}, df: {}",
            p_value, chisq, df
        ))
    } else {
        None
    }
}
