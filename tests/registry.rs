//! Registering operators for a representation the crate does not ship.

use std::sync::Arc;

use rand::Rng;

use evorun::engine::{EvolutionEngine, LocalContext, Registry, RunRng, Slot, Strategy};
use evorun::representation::{
    DecodeGene, Gene, Genotype, IdentityMap, IdentityMutation, InitGene, KidOne, MutateGene,
    OnePointCrossover, Phenotype,
};
use evorun::schema::{AlgorithmFamily, ConfigError, RunConfig};
use evorun::{EvaluationError, Problem};

const CODON_MAX: u32 = 255;

/// Random integer codons.
struct CodonInit;

impl InitGene for CodonInit {
    fn init(&self, ctx: &LocalContext, rng: &mut RunRng) -> Gene {
        let codons = (0..ctx.problem.gene_length())
            .map(|_| rng.gen_range(0..=CODON_MAX))
            .collect();
        Gene::new(Genotype::Codons(codons))
    }
}

/// Codons scaled into the unit interval.
struct CodonDecode;

impl DecodeGene for CodonDecode {
    fn decode(&self, gene: &Gene, _ctx: &LocalContext) -> Result<Phenotype, EvaluationError> {
        match &gene.genotype {
            Genotype::Codons(codons) => Ok(Phenotype::Real(
                codons.iter().map(|&c| c as f64 / CODON_MAX as f64).collect(),
            )),
            other => Err(EvaluationError::Decode(format!("not a codon gene: {other:?}"))),
        }
    }
}

/// Resets one codon.
struct CodonMutation;

impl MutateGene for CodonMutation {
    fn mutate(&self, gene: &Gene, _ctx: &LocalContext, rng: &mut RunRng) -> Gene {
        let mut gene = gene.clone();
        if let Genotype::Codons(codons) = &mut gene.genotype
            && !codons.is_empty()
        {
            let i = rng.gen_range(0..codons.len());
            codons[i] = rng.gen_range(0..=CODON_MAX);
        }
        gene
    }
}

/// Count of parameters above one half.
struct Ones {
    n: usize,
}

impl Problem for Ones {
    fn name(&self) -> String {
        format!("Ones{}", self.n)
    }

    fn f(&self, p: &Phenotype, _: &Gene, _: &LocalContext) -> Result<f64, EvaluationError> {
        let x = p
            .as_real()
            .ok_or_else(|| EvaluationError::Failed("expected real parameters".to_string()))?;
        Ok(x.iter().filter(|v| **v > 0.5).count() as f64)
    }

    fn gene_length(&self) -> usize {
        self.n
    }

    fn global_optimum(&self) -> Option<f64> {
        Some(self.n as f64)
    }
}

fn codon_registry() -> Registry {
    let mut registry = Registry::builtin();
    registry
        .register(AlgorithmFamily::Sge, "Codons", Strategy::Init(Arc::new(CodonInit)))
        .register(AlgorithmFamily::Sge, "Scale", Strategy::Decode(Arc::new(CodonDecode)))
        .register(AlgorithmFamily::Sge, "Identity", Strategy::GeneMap(Arc::new(IdentityMap)))
        .register(
            AlgorithmFamily::Sge,
            "Cross",
            Strategy::Crossover(Arc::new(OnePointCrossover { two_kids: false })),
        )
        .register(AlgorithmFamily::Sge, "Reset", Strategy::Mutation(Arc::new(CodonMutation)))
        .register(AlgorithmFamily::Sge, "Kid1", Strategy::Replication(Arc::new(KidOne)));
    registry
}

fn config() -> RunConfig {
    let mut config = RunConfig::default();
    config.algorithm = "sge".to_string();
    config.basic.popsize = 24;
    config.basic.generations = 30;
    config.basic.replay = Some(21);
    config
}

#[test]
fn test_custom_family_runs() {
    let registry = codon_registry();
    let mut engine =
        EvolutionEngine::with_registry(Arc::new(Ones { n: 10 }), config(), &registry).unwrap();
    let result = engine.run().unwrap();

    assert!(matches!(result.solution.gene.genotype, Genotype::Codons(_)));
    assert!(result.solution.value >= result.statistics.rows()[0].max);
    assert_eq!(result.config.operators.init.as_deref(), Some("Codons"));
    assert_eq!(result.config.operators.mutation.as_deref(), Some("Reset"));
}

#[test]
fn test_builtin_registry_lacks_family() {
    let outcome = EvolutionEngine::new(Arc::new(Ones { n: 4 }), config());
    assert!(matches!(outcome, Err(ConfigError::MissingOperator { .. })));
}

#[test]
fn test_unknown_method_rejected() {
    let mut cfg = config();
    cfg.operators.mutation = Some("Scramble".to_string());
    let outcome = EvolutionEngine::with_registry(Arc::new(Ones { n: 4 }), cfg, &codon_registry());
    assert!(matches!(
        outcome,
        Err(ConfigError::UnknownMethod { family: AlgorithmFamily::Sge, .. })
    ));
}

#[test]
fn test_default_can_be_changed() {
    let mut registry = codon_registry();
    registry.register(
        AlgorithmFamily::Sge,
        "Keep",
        Strategy::Mutation(Arc::new(IdentityMutation)),
    );
    registry
        .set_default(AlgorithmFamily::Sge, Slot::Mutation, "Keep")
        .unwrap();
    assert_eq!(registry.methods(AlgorithmFamily::Sge, Slot::Mutation), vec!["Keep", "Reset"]);

    let mut engine =
        EvolutionEngine::with_registry(Arc::new(Ones { n: 6 }), config(), &registry).unwrap();
    let result = engine.run().unwrap();
    assert_eq!(result.config.operators.mutation.as_deref(), Some("Keep"));
}
