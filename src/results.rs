use std::collections::BTreeMap;
use std::io::{self, Write};

use bon::Builder;
use itertools::Itertools;

use crate::{accumulator::CovariateAccumulator, math::arithmetic_mean};

/// Aggregated RONA of a single covariate
#[derive(Debug, Clone, Builder)]
pub struct CovariateResult {
    pub covariate: String,
    pub populations: Vec<String>,
    pub avg: Vec<f64>,
    pub stderr: Vec<f64>,
    pub marker_count: usize,
    /// R² of each marker's trend
    pub fit_qualities: BTreeMap<String, f64>,
}

impl CovariateResult {
    /// Reduces an accumulator into its final result
    pub fn from_accumulator(
        accumulator: &CovariateAccumulator,
        populations: &[String],
        use_weights: bool,
    ) -> Self {
        let reduction = accumulator.reduce(use_weights);
        Self::builder()
            .covariate(accumulator.covariate().to_string())
            .populations(populations.to_vec())
            .avg(reduction.avg)
            .stderr(reduction.stderr)
            .marker_count(accumulator.count_markers())
            .fit_qualities(accumulator.fit_qualities())
            .build()
    }

    fn valid_r2(&self) -> Vec<f64> {
        self.fit_qualities
            .values()
            .copied()
            .filter(|r2| !r2.is_nan())
            .collect()
    }

    pub fn min_r2(&self) -> f64 {
        self.valid_r2().into_iter().reduce(f64::min).unwrap_or(f64::NAN)
    }

    pub fn max_r2(&self) -> f64 {
        self.valid_r2().into_iter().reduce(f64::max).unwrap_or(f64::NAN)
    }

    pub fn mean_r2(&self) -> f64 {
        arithmetic_mean(&self.valid_r2())
    }
}

/// The covariates selected for reporting, most represented first
#[derive(Debug, Clone, Default)]
pub struct RonaResults {
    pub covariates: Vec<CovariateResult>,
}

impl RonaResults {
    /// Ranks covariates by marker count and keeps the first `num_covars`
    ///
    /// Ties keep the order of the input, which is the order covariates were first seen.
    pub fn from_vec(mut covariates: Vec<CovariateResult>, num_covars: usize) -> Self {
        covariates.sort_by(|a, b| b.marker_count.cmp(&a.marker_count));
        covariates.truncate(num_covars);
        Self { covariates }
    }

    pub fn is_empty(&self) -> bool {
        self.covariates.is_empty()
    }

    /// Writes the average RONA of every population followed by R² summaries
    pub fn write_summary<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.write_table(writer, |result| &result.avg)?;
        writeln!(
            writer,
            "Min R^2\t{}",
            self.covariates.iter().map(|r| r.min_r2()).join("\t")
        )?;
        writeln!(
            writer,
            "Max R^2\t{}",
            self.covariates.iter().map(|r| r.max_r2()).join("\t")
        )?;
        writeln!(
            writer,
            "Average R^2\t{}",
            self.covariates.iter().map(|r| r.mean_r2()).join("\t")
        )
    }

    /// Writes the standard error of the average RONA of every population
    pub fn write_stderr<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.write_table(writer, |result| &result.stderr)
    }

    fn write_table<W, F>(&self, writer: &mut W, values: F) -> io::Result<()>
    where
        W: Write,
        F: Fn(&CovariateResult) -> &Vec<f64>,
    {
        let Some(first) = self.covariates.first() else {
            return Ok(());
        };
        writeln!(
            writer,
            "Covar\t{}",
            self.covariates.iter().map(|r| &r.covariate).join("\t")
        )?;
        writeln!(
            writer,
            "#SNPs\t{}",
            self.covariates.iter().map(|r| r.marker_count).join("\t")
        )?;
        for (i, population) in first.populations.iter().enumerate() {
            writeln!(
                writer,
                "{}\t{}",
                population,
                self.covariates.iter().map(|r| values(r)[i]).join("\t")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn result(covariate: &str, marker_count: usize) -> CovariateResult {
        let fit_qualities = (0..marker_count)
            .map(|i| (format!("m{i}"), 0.1 * (i + 1) as f64))
            .collect::<BTreeMap<_, _>>();
        CovariateResult::builder()
            .covariate(covariate.to_string())
            .populations(vec!["North".to_string(), "South".to_string()])
            .avg(vec![0.25, 0.5])
            .stderr(vec![0.0, 0.125])
            .marker_count(marker_count)
            .fit_qualities(fit_qualities)
            .build()
    }

    #[test]
    fn test_ranking_is_stable() {
        let results = RonaResults::from_vec(
            vec![result("4", 2), result("5", 3), result("6", 2), result("7", 1)],
            3,
        );
        let order = results
            .covariates
            .iter()
            .map(|r| r.covariate.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["5", "4", "6"]);
    }

    #[test]
    fn test_r2_summaries() {
        let mut r = result("4", 3);
        r.fit_qualities.insert("nan".to_string(), f64::NAN);
        assert_relative_eq!(r.min_r2(), 0.1);
        assert_relative_eq!(r.max_r2(), 0.3, epsilon = 1e-12);
        assert_relative_eq!(r.mean_r2(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_write_summary() {
        let results = RonaResults::from_vec(vec![result("4", 1), result("9", 2)], 3);
        let mut buffer = Vec::new();
        results.write_summary(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Covar\t9\t4");
        assert_eq!(lines[1], "#SNPs\t2\t1");
        assert_eq!(lines[2], "North\t0.25\t0.25");
        assert_eq!(lines[3], "South\t0.5\t0.5");
        assert_eq!(lines[4], "Min R^2\t0.1\t0.1");
        assert!(lines[5].starts_with("Max R^2\t0.2"));
        assert!(lines[6].starts_with("Average R^2\t"));
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_write_stderr() {
        let results = RonaResults::from_vec(vec![result("4", 1)], 3);
        let mut buffer = Vec::new();
        results.write_stderr(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("South\t0.125"));
    }

    #[test]
    fn test_empty_results_write_nothing() {
        let results = RonaResults::default();
        let mut buffer = Vec::new();
        results.write_stderr(&mut buffer).unwrap();
        assert!(buffer.is_empty());
    }
}
