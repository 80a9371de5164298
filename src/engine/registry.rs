//! Configuration resolution: (family, slot, method) to operator strategy.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::representation::{
    Bin2Dec, BinaryDecode, BinaryInit, BitFlipMutation, CrossoverGene, DecodeGene,
    DifferentialReplication, GaussianMutation, GeneMap, GrayMap, IdentityMap, IdentityMutation,
    InitGene, InversionMutation, KidOne, KidTwo, MutateGene, OnePointCrossover, OrderCrossover,
    PermutationDecode, PermutationInit, RealDecode, RealInit, ReplicateGene, SwapMutation,
    UniformCrossover,
};
use crate::schema::{AcceptanceRule, AlgorithmFamily, ConfigError, OperatorConfig, RunConfig};

/// Operator slot of a gene representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Init,
    Decode,
    GeneMap,
    Crossover,
    Mutation,
    Replication,
}

impl Slot {
    pub const ALL: [Slot; 6] = [
        Slot::Init,
        Slot::Decode,
        Slot::GeneMap,
        Slot::Crossover,
        Slot::Mutation,
        Slot::Replication,
    ];
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Slot::Init => "init",
            Slot::Decode => "decode",
            Slot::GeneMap => "gene map",
            Slot::Crossover => "crossover",
            Slot::Mutation => "mutation",
            Slot::Replication => "replication",
        })
    }
}

/// A registered operator, one variant per slot.
#[derive(Clone)]
pub enum Strategy {
    Init(Arc<dyn InitGene>),
    Decode(Arc<dyn DecodeGene>),
    GeneMap(Arc<dyn GeneMap>),
    Crossover(Arc<dyn CrossoverGene>),
    Mutation(Arc<dyn MutateGene>),
    Replication(Arc<dyn ReplicateGene>),
}

impl Strategy {
    pub fn slot(&self) -> Slot {
        match self {
            Strategy::Init(_) => Slot::Init,
            Strategy::Decode(_) => Slot::Decode,
            Strategy::GeneMap(_) => Slot::GeneMap,
            Strategy::Crossover(_) => Slot::Crossover,
            Strategy::Mutation(_) => Slot::Mutation,
            Strategy::Replication(_) => Slot::Replication,
        }
    }
}

/// Method names chosen for each slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperatorNames {
    pub init: String,
    pub decode: String,
    pub gene_map: String,
    pub crossover: String,
    pub mutation: String,
    pub replication: String,
}

/// Resolved gene operators of one family.
#[derive(Clone)]
pub struct GeneOperators {
    pub init: Arc<dyn InitGene>,
    pub decode: Arc<dyn DecodeGene>,
    pub gene_map: Arc<dyn GeneMap>,
    pub crossover: Arc<dyn CrossoverGene>,
    pub mutation: Arc<dyn MutateGene>,
    pub replication: Arc<dyn ReplicateGene>,
    pub names: OperatorNames,
}

impl GeneOperators {
    /// Write the resolved method names back into an operator configuration.
    pub fn record_into(&self, operators: &mut OperatorConfig) {
        operators.init = Some(self.names.init.clone());
        operators.decode = Some(self.names.decode.clone());
        operators.gene_map = Some(self.names.gene_map.clone());
        operators.crossover = Some(self.names.crossover.clone());
        operators.mutation = Some(self.names.mutation.clone());
        operators.replication = Some(self.names.replication.clone());
    }
}

#[derive(Clone, Default)]
struct SlotEntry {
    default: String,
    methods: BTreeMap<String, Strategy>,
}

/// Operator registry. [`Registry::builtin`] holds the binary, real-valued and
/// permutation families; other families are filled with [`Registry::register`].
#[derive(Clone, Default)]
pub struct Registry {
    entries: BTreeMap<(AlgorithmFamily, Slot), SlotEntry>,
}

impl Registry {
    /// Registry with nothing registered.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        let kid1: Arc<dyn ReplicateGene> = Arc::new(KidOne);
        let kid2: Arc<dyn ReplicateGene> = Arc::new(KidTwo);
        let identity_map: Arc<dyn GeneMap> = Arc::new(IdentityMap);

        registry
            .register(AlgorithmFamily::Sga, "InitGene", Strategy::Init(Arc::new(BinaryInit)))
            .register(AlgorithmFamily::Sga, "DecodeGene", Strategy::Decode(Arc::new(BinaryDecode)))
            .register(AlgorithmFamily::Sga, "Bin2Dec", Strategy::GeneMap(Arc::new(Bin2Dec)))
            .register(AlgorithmFamily::Sga, "Gray", Strategy::GeneMap(Arc::new(GrayMap)))
            .register(
                AlgorithmFamily::Sga,
                "Cross",
                Strategy::Crossover(Arc::new(OnePointCrossover { two_kids: false })),
            )
            .register(
                AlgorithmFamily::Sga,
                "Cross2",
                Strategy::Crossover(Arc::new(OnePointCrossover { two_kids: true })),
            )
            .register(AlgorithmFamily::Sga, "UCross", Strategy::Crossover(Arc::new(UniformCrossover)))
            .register(AlgorithmFamily::Sga, "MutateGene", Strategy::Mutation(Arc::new(BitFlipMutation)))
            .register(AlgorithmFamily::Sga, "Kid1", Strategy::Replication(kid1.clone()))
            .register(AlgorithmFamily::Sga, "Kid2", Strategy::Replication(kid2.clone()));

        registry
            .register(AlgorithmFamily::Sgde, "InitGene", Strategy::Init(Arc::new(RealInit)))
            .register(AlgorithmFamily::Sgde, "DecodeGene", Strategy::Decode(Arc::new(RealDecode)))
            .register(AlgorithmFamily::Sgde, "Identity", Strategy::GeneMap(identity_map.clone()))
            .register(AlgorithmFamily::Sgde, "UCross", Strategy::Crossover(Arc::new(UniformCrossover)))
            .register(AlgorithmFamily::Sgde, "Gaussian", Strategy::Mutation(Arc::new(GaussianMutation)))
            .register(AlgorithmFamily::Sgde, "Identity", Strategy::Mutation(Arc::new(IdentityMutation)))
            .register(
                AlgorithmFamily::Sgde,
                "DE",
                Strategy::Replication(Arc::new(DifferentialReplication)),
            );

        registry
            .register(AlgorithmFamily::Sgperm, "InitGene", Strategy::Init(Arc::new(PermutationInit)))
            .register(
                AlgorithmFamily::Sgperm,
                "DecodeGene",
                Strategy::Decode(Arc::new(PermutationDecode)),
            )
            .register(AlgorithmFamily::Sgperm, "Identity", Strategy::GeneMap(identity_map))
            .register(
                AlgorithmFamily::Sgperm,
                "OrderCross",
                Strategy::Crossover(Arc::new(OrderCrossover { two_kids: false })),
            )
            .register(
                AlgorithmFamily::Sgperm,
                "OrderCross2",
                Strategy::Crossover(Arc::new(OrderCrossover { two_kids: true })),
            )
            .register(AlgorithmFamily::Sgperm, "Swap", Strategy::Mutation(Arc::new(SwapMutation)))
            .register(
                AlgorithmFamily::Sgperm,
                "Inversion",
                Strategy::Mutation(Arc::new(InversionMutation)),
            )
            .register(AlgorithmFamily::Sgperm, "Kid1", Strategy::Replication(kid1))
            .register(AlgorithmFamily::Sgperm, "Kid2", Strategy::Replication(kid2));

        registry
    }

    /// Register `strategy` under `method` for its slot. The first method
    /// registered for a (family, slot) pair becomes its default.
    pub fn register(&mut self, family: AlgorithmFamily, method: &str, strategy: Strategy) -> &mut Self {
        let entry = self.entries.entry((family, strategy.slot())).or_default();
        if entry.methods.is_empty() {
            entry.default = method.to_string();
        }
        entry.methods.insert(method.to_string(), strategy);
        self
    }

    /// Change the default method of a slot.
    pub fn set_default(&mut self, family: AlgorithmFamily, slot: Slot, method: &str) -> Result<(), ConfigError> {
        match self.entries.get_mut(&(family, slot)) {
            Some(entry) if entry.methods.contains_key(method) => {
                entry.default = method.to_string();
                Ok(())
            }
            Some(_) => Err(ConfigError::UnknownMethod {
                family,
                slot: slot.to_string(),
                method: method.to_string(),
            }),
            None => Err(ConfigError::MissingOperator {
                family,
                slot: slot.to_string(),
            }),
        }
    }

    /// Registered method names of a slot.
    pub fn methods(&self, family: AlgorithmFamily, slot: Slot) -> Vec<&str> {
        self.entries
            .get(&(family, slot))
            .map(|entry| entry.methods.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Resolve one slot; `None` selects the family default.
    pub fn resolve_slot(
        &self,
        family: AlgorithmFamily,
        slot: Slot,
        method: Option<&str>,
    ) -> Result<(String, Strategy), ConfigError> {
        let entry = self
            .entries
            .get(&(family, slot))
            .filter(|entry| !entry.methods.is_empty())
            .ok_or_else(|| ConfigError::MissingOperator {
                family,
                slot: slot.to_string(),
            })?;
        let name = method.unwrap_or(entry.default.as_str());
        let strategy = entry
            .methods
            .get(name)
            .ok_or_else(|| ConfigError::UnknownMethod {
                family,
                slot: slot.to_string(),
                method: name.to_string(),
            })?;
        Ok((name.to_string(), strategy.clone()))
    }

    /// Resolve every gene operator slot for `config`, checking that the
    /// acceptance rule is supported by the replication method.
    pub fn resolve(&self, config: &RunConfig) -> Result<GeneOperators, ConfigError> {
        let family = config.family()?;
        let ops = &config.operators;
        let missing = |slot: Slot| ConfigError::MissingOperator {
            family,
            slot: slot.to_string(),
        };

        let (init_name, init) = self.resolve_slot(family, Slot::Init, ops.init.as_deref())?;
        let (decode_name, decode) = self.resolve_slot(family, Slot::Decode, ops.decode.as_deref())?;
        let (map_name, gene_map) = self.resolve_slot(family, Slot::GeneMap, ops.gene_map.as_deref())?;
        let (cross_name, crossover) =
            self.resolve_slot(family, Slot::Crossover, ops.crossover.as_deref())?;
        let (mutation_name, mutation) =
            self.resolve_slot(family, Slot::Mutation, ops.mutation.as_deref())?;
        let (replication_name, replication) =
            self.resolve_slot(family, Slot::Replication, ops.replication.as_deref())?;

        let Strategy::Init(init) = init else {
            return Err(missing(Slot::Init));
        };
        let Strategy::Decode(decode) = decode else {
            return Err(missing(Slot::Decode));
        };
        let Strategy::GeneMap(gene_map) = gene_map else {
            return Err(missing(Slot::GeneMap));
        };
        let Strategy::Crossover(crossover) = crossover else {
            return Err(missing(Slot::Crossover));
        };
        let Strategy::Mutation(mutation) = mutation else {
            return Err(missing(Slot::Mutation));
        };
        let Strategy::Replication(replication) = replication else {
            return Err(missing(Slot::Replication));
        };

        if config.acceptance.rule != AcceptanceRule::All && !replication.embeds_acceptance() {
            return Err(ConfigError::AcceptanceNotSupported {
                replication: replication_name,
                rule: config.acceptance.rule,
            });
        }

        Ok(GeneOperators {
            init,
            decode,
            gene_map,
            crossover,
            mutation,
            replication,
            names: OperatorNames {
                init: init_name,
                decode: decode_name,
                gene_map: map_name,
                crossover: cross_name,
                mutation: mutation_name,
                replication: replication_name,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(algorithm: &str) -> RunConfig {
        RunConfig {
            algorithm: algorithm.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_builtin_defaults() {
        let registry = Registry::builtin();
        let names = registry.resolve(&config("sga")).unwrap().names;
        assert_eq!(names.gene_map, "Bin2Dec");
        assert_eq!(names.crossover, "Cross");
        assert_eq!(names.replication, "Kid1");

        let names = registry.resolve(&config("sgde")).unwrap().names;
        assert_eq!(names.crossover, "UCross");
        assert_eq!(names.mutation, "Gaussian");
        assert_eq!(names.replication, "DE");

        let names = registry.resolve(&config("sgperm")).unwrap().names;
        assert_eq!(names.crossover, "OrderCross");
        assert_eq!(names.mutation, "Swap");
    }

    #[test]
    fn test_unknown_method_named() {
        let mut cfg = config("sga");
        cfg.operators.crossover = Some("Cross9".to_string());
        match Registry::builtin().resolve(&cfg) {
            Err(ConfigError::UnknownMethod { method, slot, .. }) => {
                assert_eq!(method, "Cross9");
                assert_eq!(slot, "crossover");
            }
            _ => panic!("expected unknown method error"),
        }
    }

    #[test]
    fn test_known_family_without_operators() {
        assert!(matches!(
            Registry::builtin().resolve(&config("sge")),
            Err(ConfigError::MissingOperator {
                family: AlgorithmFamily::Sge,
                ..
            })
        ));
    }

    #[test]
    fn test_kid2_rejects_non_all_acceptance() {
        let mut cfg = config("sga");
        cfg.operators.replication = Some("Kid2".to_string());
        cfg.acceptance.rule = AcceptanceRule::Best;
        assert!(matches!(
            Registry::builtin().resolve(&cfg),
            Err(ConfigError::AcceptanceNotSupported { .. })
        ));
        cfg.acceptance.rule = AcceptanceRule::All;
        assert!(Registry::builtin().resolve(&cfg).is_ok());
    }

    #[test]
    fn test_register_custom_family() {
        let mut registry = Registry::builtin();
        registry
            .register(AlgorithmFamily::Sge, "InitGene", Strategy::Init(Arc::new(BinaryInit)))
            .register(AlgorithmFamily::Sge, "DecodeGene", Strategy::Decode(Arc::new(BinaryDecode)))
            .register(AlgorithmFamily::Sge, "Gray", Strategy::GeneMap(Arc::new(GrayMap)))
            .register(AlgorithmFamily::Sge, "Cross2", Strategy::Crossover(Arc::new(UniformCrossover)))
            .register(AlgorithmFamily::Sge, "MutateGene", Strategy::Mutation(Arc::new(BitFlipMutation)))
            .register(AlgorithmFamily::Sge, "Kid1", Strategy::Replication(Arc::new(KidOne)));
        assert_eq!(registry.resolve(&config("sge")).unwrap().names.gene_map, "Gray");
        assert_eq!(registry.methods(AlgorithmFamily::Sge, Slot::Replication), vec!["Kid1"]);
    }

    #[test]
    fn test_set_default() {
        let mut registry = Registry::builtin();
        registry
            .set_default(AlgorithmFamily::Sga, Slot::GeneMap, "Gray")
            .unwrap();
        assert_eq!(registry.resolve(&config("sga")).unwrap().names.gene_map, "Gray");
        assert!(registry.set_default(AlgorithmFamily::Sga, Slot::GeneMap, "Nope").is_err());
    }
}
