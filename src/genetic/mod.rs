// =============================================================================
// Genetic Engine — population generation, fitness, selection, breeding
// =============================================================================

pub mod catalog;
pub mod engine;

pub use engine::{EvolutionCycle, GeneticEngine, GeneticParams, SelectionResult};
