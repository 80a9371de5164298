//! Binary genes: random bit strings decoded segment-wise into real parameters.

use rand::Rng;

use super::{DecodeGene, Gene, GeneMap, Genotype, InitGene, MutateGene, Phenotype, Segment};
use crate::engine::{LocalContext, RunRng};
use crate::problem::EvaluationError;

/// Uniformly random bits, `sum(problem.bits())` of them.
#[derive(Debug, Clone, Copy)]
pub struct BinaryInit;

impl InitGene for BinaryInit {
    fn init(&self, ctx: &LocalContext, rng: &mut RunRng) -> Gene {
        let length: usize = ctx.problem.bits().iter().sum();
        Gene::binary((0..length).map(|_| rng.gen_bool(0.5)).collect())
    }
}

/// Splits the bit string by `problem.bits()` and maps every segment with the
/// configured gene map.
#[derive(Debug, Clone, Copy)]
pub struct BinaryDecode;

impl DecodeGene for BinaryDecode {
    fn decode(&self, gene: &Gene, ctx: &LocalContext) -> Result<Phenotype, EvaluationError> {
        let Genotype::Binary(bits) = &gene.genotype else {
            return Err(EvaluationError::Decode("expected a binary gene".to_string()));
        };
        let widths = ctx.problem.bits();
        let lower = ctx.problem.lower();
        let upper = ctx.problem.upper();
        if widths.iter().sum::<usize>() != bits.len()
            || lower.len() != widths.len()
            || upper.len() != widths.len()
        {
            return Err(EvaluationError::Decode(format!(
                "gene of {} bits does not match {} parameters",
                bits.len(),
                widths.len()
            )));
        }

        let mut values = Vec::with_capacity(widths.len());
        let mut offset = 0;
        for (i, width) in widths.iter().enumerate() {
            let segment = &bits[offset..offset + width];
            values.push(ctx.genes.gene_map.map(Segment::Bits(segment), lower[i], upper[i]));
            offset += width;
        }
        Ok(Phenotype::Real(values))
    }
}

fn bits_to_unit(bits: &[bool]) -> f64 {
    if bits.is_empty() {
        return 0.0;
    }
    let value = bits
        .iter()
        .fold(0.0_f64, |acc, &bit| acc * 2.0 + if bit { 1.0 } else { 0.0 });
    let max = 2.0_f64.powi(bits.len() as i32) - 1.0;
    value / max
}

fn scale(unit: f64, lower: f64, upper: f64) -> f64 {
    lower + (upper - lower) * unit
}

/// Standard binary to decimal mapping.
#[derive(Debug, Clone, Copy)]
pub struct Bin2Dec;

impl GeneMap for Bin2Dec {
    fn map(&self, segment: Segment<'_>, lower: f64, upper: f64) -> f64 {
        match segment {
            Segment::Bits(bits) => scale(bits_to_unit(bits), lower, upper),
            Segment::Real(value) => value.clamp(lower.min(upper), upper.max(lower)),
        }
    }
}

/// Gray-coded binary to decimal mapping.
#[derive(Debug, Clone, Copy)]
pub struct GrayMap;

impl GeneMap for GrayMap {
    fn map(&self, segment: Segment<'_>, lower: f64, upper: f64) -> f64 {
        match segment {
            Segment::Bits(gray) => {
                let mut binary = Vec::with_capacity(gray.len());
                let mut previous = false;
                for &bit in gray {
                    previous ^= bit;
                    binary.push(previous);
                }
                scale(bits_to_unit(&binary), lower, upper)
            }
            Segment::Real(value) => Bin2Dec.map(Segment::Real(value), lower, upper),
        }
    }
}

/// Flips each bit with probability `operators.bit_mutation_rate`.
#[derive(Debug, Clone, Copy)]
pub struct BitFlipMutation;

impl MutateGene for BitFlipMutation {
    fn mutate(&self, gene: &Gene, ctx: &LocalContext, rng: &mut RunRng) -> Gene {
        let Genotype::Binary(bits) = &gene.genotype else {
            return gene.clone();
        };
        let rate = ctx.config.operators.bit_mutation_rate;
        Gene::binary(
            bits.iter()
                .map(|&bit| if rng.r#gen::<f64>() < rate { !bit } else { bit })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin2dec_bounds() {
        let map = Bin2Dec;
        assert_eq!(map.map(Segment::Bits(&[false; 4]), -1.0, 1.0), -1.0);
        assert_eq!(map.map(Segment::Bits(&[true; 4]), -1.0, 1.0), 1.0);
        // 0b0101 = 5 of 15
        let mid = map.map(Segment::Bits(&[false, true, false, true]), 0.0, 15.0);
        assert!((mid - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_gray_decoding() {
        // Gray 0111 is binary 0101.
        let value = GrayMap.map(Segment::Bits(&[false, true, true, true]), 0.0, 15.0);
        assert!((value - 5.0).abs() < 1e-12);
        // Gray 1000 is binary 1111.
        let value = GrayMap.map(Segment::Bits(&[true, false, false, false]), 0.0, 15.0);
        assert!((value - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_segment_maps_to_lower() {
        assert_eq!(Bin2Dec.map(Segment::Bits(&[]), 2.0, 3.0), 2.0);
    }
}
