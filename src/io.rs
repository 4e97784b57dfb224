//! Readers for the files produced and consumed by BayPass and LFMM.
//!
//! Every reader takes a `BufRead` so it can be used on files (see [`open`]) or on
//! in-memory data.
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::population::{Association, CovariateTable, FrequencyTable, PopulationOrder};

/// Genotype value LFMM uses for missing data
const LFMM_MISSING: f64 = 9.0;

/// Significance columns of a BayPass betai summary, in increasing order of preference
const BAYPASS_SIGNIFICANCE_COLUMNS: [&str; 2] = ["eBPmc", "BF(dB)"];

pub fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Unable to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn parse_values<'a>(
    fields: impl Iterator<Item = &'a str>,
    line_number: usize,
) -> Result<Vec<f64>> {
    fields
        .map(|field| {
            field
                .parse::<f64>()
                .with_context(|| format!("line {line_number}: invalid number '{field}'"))
        })
        .collect()
}

/// Reads one population name per line, in the order used by the BayPass input files
pub fn read_popnames<R: BufRead>(reader: R) -> Result<PopulationOrder> {
    let mut names = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let name = line.trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    Ok(PopulationOrder::new(names))
}

/// Reads a BayPass environment file: one covariate per line, one value per population
///
/// Covariates are identified by their 1-based line number.
pub fn read_baypass_envfile<R: BufRead>(reader: R) -> Result<CovariateTable> {
    let mut columns = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        columns.push(parse_values(line.split_whitespace(), idx + 1)?);
    }
    Ok(CovariateTable::from_columns(columns))
}

/// Reads the significant associations of a BayPass betai summary file
///
/// The significance column is `BF(dB)`, or `eBPmc` when no Bayes factor is present.
/// A row is kept when its covariate is not immutable and its value reaches `threshold`.
pub fn read_baypass_betai<R: BufRead>(
    reader: R,
    threshold: f64,
    immutables: &[String],
) -> Result<Vec<Association>> {
    let mut lines = reader.lines();
    let header = lines.next().context("betai summary is empty")??;
    let header = header.split_whitespace().collect::<Vec<_>>();
    let Some(column) = BAYPASS_SIGNIFICANCE_COLUMNS
        .iter()
        .rev()
        .find_map(|name| header.iter().position(|h| h == name))
    else {
        bail!(
            "betai summary header has none of the columns {:?}",
            BAYPASS_SIGNIFICANCE_COLUMNS
        );
    };

    let mut associations = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        let fields = line.split_whitespace().collect::<Vec<_>>();
        if fields.is_empty() {
            continue;
        }
        let line_number = idx + 2;
        if fields.len() <= column.max(1) {
            bail!("line {line_number}: expected at least {} columns", column.max(1) + 1);
        }
        let covariate = fields[0];
        if immutables.iter().any(|i| i == covariate) {
            continue;
        }
        let value = fields[column]
            .parse::<f64>()
            .with_context(|| format!("line {line_number}: invalid value '{}'", fields[column]))?;
        if value >= threshold {
            associations.push(Association::new(fields[1].to_string(), covariate.to_string()));
        }
    }
    Ok(associations)
}

/// Reads the standardized allele frequencies of the associated markers from a BayPass pij file
///
/// Each row holds one population of one marker; rows are taken in file order.
pub fn read_baypass_pij<R: BufRead>(
    reader: R,
    associations: &[Association],
) -> Result<FrequencyTable> {
    let markers = associations
        .iter()
        .map(|a| a.marker.as_str())
        .collect::<HashSet<_>>();
    let mut frequencies = FrequencyTable::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let fields = line.split_whitespace().collect::<Vec<_>>();
        let Some(marker) = fields.get(1) else {
            continue;
        };
        if !markers.contains(marker) {
            continue;
        }
        let value = fields
            .get(4)
            .with_context(|| format!("line {}: missing frequency column", idx + 1))?;
        let freq = value
            .parse::<f64>()
            .with_context(|| format!("line {}: invalid frequency '{value}'", idx + 1))?;
        frequencies
            .entry(marker.to_string())
            .or_insert_with(Vec::new)
            .push(freq);
    }
    Ok(frequencies)
}

/// Reads the significant associations of an LFMM results file
///
/// Each row holds the comma separated p-values of one SNP, one per covariate. SNPs
/// and covariates are identified by their 1-based position. Immutable covariates are
/// left out, and an association is kept when its p-value is below `threshold`.
/// Every row must have as many p-values as the first one.
pub fn read_lfmm_results<R: BufRead>(
    reader: R,
    threshold: f64,
    immutables: &[String],
) -> Result<Vec<Association>> {
    let mut layout: Option<(usize, Vec<usize>)> = None;
    let mut associations = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let snp = idx + 1;
        let pvalues = parse_values(line.split(',').map(str::trim), snp)?;
        let (width, retained) = layout.get_or_insert_with(|| {
            let retained = (0..pvalues.len())
                .filter(|c| !immutables.contains(&(c + 1).to_string()))
                .collect();
            (pvalues.len(), retained)
        });
        if pvalues.len() != *width {
            bail!("line {snp}: expected {width} p-values, found {}", pvalues.len());
        }
        associations.extend(
            retained
                .iter()
                .filter(|c| pvalues[**c] < threshold)
                .map(|c| Association::new(snp.to_string(), (c + 1).to_string())),
        );
    }
    Ok(associations)
}

/// Environmental data of an LFMM run, averaged per population
#[derive(Debug, Clone)]
pub struct LfmmEnvironment {
    pub populations: PopulationOrder,
    /// Number of individuals of each population, in population order
    pub sizes: Vec<usize>,
    pub covariates: CovariateTable,
}

/// Reads an LFMM environment file
///
/// Each row is an individual: its population name followed by its covariate values.
/// Individuals of a population must be contiguous. Covariate values are averaged
/// per population and covariates are identified by their 1-based column.
pub fn read_lfmm_envfile<R: BufRead>(reader: R) -> Result<LfmmEnvironment> {
    let mut names: Vec<String> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut sums: Vec<Vec<f64>> = Vec::new();
    let mut seen = HashSet::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let mut fields = line.split_whitespace();
        let Some(name) = fields.next() else {
            continue;
        };
        let values = parse_values(fields, idx + 1)?;

        if names.last().map(String::as_str) != Some(name) {
            if !seen.insert(name.to_string()) {
                bail!(
                    "line {}: individuals of population '{name}' are not contiguous",
                    idx + 1
                );
            }
            names.push(name.to_string());
            sizes.push(0);
            sums.push(vec![0.0; values.len()]);
        }

        let pop = names.len() - 1;
        if values.len() != sums[pop].len() {
            bail!(
                "line {}: expected {} covariate values, found {}",
                idx + 1,
                sums[pop].len(),
                values.len()
            );
        }
        sizes[pop] += 1;
        sums[pop].iter_mut().zip(values).for_each(|(s, v)| *s += v);
    }

    let num_covariates = sums.first().map_or(0, Vec::len);
    if sums.iter().any(|s| s.len() != num_covariates) {
        bail!("populations do not all have {num_covariates} covariates");
    }
    let columns = (0..num_covariates)
        .map(|c| {
            sums.iter()
                .zip(sizes.iter())
                .map(|(s, n)| s[c] / *n as f64)
                .collect()
        })
        .collect();

    Ok(LfmmEnvironment {
        populations: PopulationOrder::new(names),
        sizes,
        covariates: CovariateTable::from_columns(columns),
    })
}

/// Computes population allele frequencies of the associated SNPs from an LFMM genotype file
///
/// Rows are individuals, grouped in populations of `sizes` individuals, and columns are
/// SNPs coded 0, 1, 2 or 9 (missing). A population without any called genotype has a
/// NaN frequency.
pub fn read_lfmm_genotypes<R: BufRead>(
    reader: R,
    sizes: &[usize],
    associations: &[Association],
) -> Result<FrequencyTable> {
    let mut snps = associations
        .iter()
        .map(|a| {
            a.marker
                .parse::<usize>()
                .ok()
                .filter(|snp| *snp > 0)
                .with_context(|| format!("'{}' is not an LFMM SNP number", a.marker))
        })
        .collect::<Result<Vec<_>>>()?;
    snps.sort_unstable();
    snps.dedup();

    // (allele sum, called individuals) per population, per requested SNP
    let mut counts = vec![vec![(0.0, 0usize); sizes.len()]; snps.len()];
    let pop_of_row = sizes
        .iter()
        .enumerate()
        .flat_map(|(pop, n)| std::iter::repeat(pop).take(*n))
        .collect::<Vec<_>>();

    let mut row = 0;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let Some(pop) = pop_of_row.get(row) else {
            bail!(
                "line {}: more individuals than the {} in the environment file",
                idx + 1,
                pop_of_row.len()
            );
        };
        let genotypes = parse_values(line.split_whitespace(), idx + 1)?;
        for (snp, snp_counts) in snps.iter().zip(counts.iter_mut()) {
            let genotype = genotypes.get(snp - 1).with_context(|| {
                format!("line {}: SNP {snp} is beyond the {} columns", idx + 1, genotypes.len())
            })?;
            if *genotype != LFMM_MISSING {
                snp_counts[*pop].0 += *genotype;
                snp_counts[*pop].1 += 1;
            }
        }
        row += 1;
    }
    if row != pop_of_row.len() {
        bail!(
            "found {row} individuals but the environment file lists {}",
            pop_of_row.len()
        );
    }

    Ok(snps
        .iter()
        .zip(counts)
        .map(|(snp, snp_counts)| {
            let freqs = snp_counts
                .into_iter()
                .map(|(sum, called)| {
                    if called == 0 {
                        f64::NAN
                    } else {
                        sum / (2 * called) as f64
                    }
                })
                .collect();
            (snp.to_string(), freqs)
        })
        .collect())
}
